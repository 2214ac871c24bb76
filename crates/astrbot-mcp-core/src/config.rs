//! Configuration types for MCP server connections
//!
//! A server entry is plain JSON as found in `mcp_server.json`. The presence of
//! a `url` key selects a network transport; everything else is launched as a
//! local subprocess speaking MCP over stdio.

use crate::{McpError, McpResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Connect timeout for SSE servers when `timeout` is not configured
pub const DEFAULT_SSE_TIMEOUT_SECS: f64 = 5.0;

/// Request timeout for streamable HTTP servers when `timeout` is not configured
pub const DEFAULT_STREAMABLE_HTTP_TIMEOUT_SECS: f64 = 30.0;

/// Read timeout for the long-lived event stream
pub const DEFAULT_SSE_READ_TIMEOUT_SECS: f64 = 300.0;

/// Per-request read timeout on an established session
pub const DEFAULT_SESSION_READ_TIMEOUT_SECS: f64 = 20.0;

/// Timeout of the one-shot reachability probe
pub const DEFAULT_PROBE_TIMEOUT_SECS: f64 = 10.0;

/// Network transport used for a URL-based server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Server-Sent Events (the default when `transport` is absent)
    #[default]
    Sse,
    /// Streamable HTTP (MCP 2025-03-26 transport)
    StreamableHttp,
}

/// Parameters for a server reached over the network
#[derive(Debug, Clone, PartialEq)]
pub struct UrlServerParams {
    pub url: String,
    pub transport: TransportKind,
    pub headers: HashMap<String, String>,
    /// Connect/request timeout of the transport
    pub timeout: Duration,
    /// Timeout of the reachability probe
    pub probe_timeout: Duration,
    pub sse_read_timeout: Duration,
    pub session_read_timeout: Duration,
    pub terminate_on_close: bool,
}

/// Parameters for a subprocess server speaking MCP over stdio
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StdioServerParams {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<String>,
}

/// Where and how to reach one MCP server
#[derive(Debug, Clone, PartialEq)]
pub enum McpServerSource {
    Stdio(StdioServerParams),
    Url(UrlServerParams),
}

impl McpServerSource {
    /// Short transport label for logging
    pub fn transport_name(&self) -> &'static str {
        match self {
            McpServerSource::Stdio(_) => "stdio",
            McpServerSource::Url(p) => match p.transport {
                TransportKind::Sse => "sse",
                TransportKind::StreamableHttp => "streamable_http",
            },
        }
    }
}

/// Parsed configuration of a single MCP server
#[derive(Debug, Clone, PartialEq)]
pub struct McpServerConfig {
    /// Whether the server should be connected at startup
    pub active: bool,
    pub source: McpServerSource,
}

impl McpServerConfig {
    /// Parse either `{"mcpServers": {name: {...}}}` (first entry wins) or a
    /// flat server object.
    pub fn from_value(value: &Value) -> McpResult<Self> {
        let mut cfg = prepare_config(value)?;
        let active = match cfg.remove("active") {
            Some(Value::Bool(b)) => b,
            Some(Value::Null) | None => true,
            Some(other) => {
                return Err(McpError::InvalidConfig(format!(
                    "`active` must be a boolean, got {}",
                    other
                )))
            }
        };

        let source = if cfg.contains_key("url") {
            McpServerSource::Url(parse_url_params(&cfg)?)
        } else {
            McpServerSource::Stdio(parse_stdio_params(&cfg)?)
        };

        Ok(Self { active, source })
    }
}

/// Unwrap the `mcpServers` envelope when it is present and non-empty.
pub fn prepare_config(value: &Value) -> McpResult<Map<String, Value>> {
    let obj = value
        .as_object()
        .ok_or_else(|| McpError::InvalidConfig("server config must be a JSON object".to_string()))?;

    match obj.get("mcpServers").and_then(Value::as_object) {
        Some(servers) if !servers.is_empty() => {
            let (name, first) = servers
                .iter()
                .next()
                .ok_or_else(|| McpError::InvalidConfig("empty mcpServers".to_string()))?;
            first.as_object().cloned().ok_or_else(|| {
                McpError::InvalidConfig(format!("server entry {} must be a JSON object", name))
            })
        }
        _ => Ok(obj.clone()),
    }
}

/// Whether a raw server entry is marked active (absent means active)
pub fn is_active(value: &Value) -> bool {
    value.get("active").and_then(Value::as_bool).unwrap_or(true)
}

fn parse_url_params(cfg: &Map<String, Value>) -> McpResult<UrlServerParams> {
    let url = cfg
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidConfig("`url` must be a string".to_string()))?
        .to_string();

    let transport = match cfg.get("transport") {
        None | Some(Value::Null) => TransportKind::Sse,
        Some(v) => serde_json::from_value(v.clone()).map_err(|_| {
            McpError::InvalidConfig(format!(
                "unknown transport {}, expected \"sse\" or \"streamable_http\"",
                v
            ))
        })?,
    };

    let default_timeout = match transport {
        TransportKind::Sse => DEFAULT_SSE_TIMEOUT_SECS,
        TransportKind::StreamableHttp => DEFAULT_STREAMABLE_HTTP_TIMEOUT_SECS,
    };

    Ok(UrlServerParams {
        url,
        transport,
        headers: string_map(cfg, "headers")?,
        timeout: seconds(cfg, "timeout", default_timeout)?,
        probe_timeout: seconds(cfg, "timeout", DEFAULT_PROBE_TIMEOUT_SECS)?,
        sse_read_timeout: seconds(cfg, "sse_read_timeout", DEFAULT_SSE_READ_TIMEOUT_SECS)?,
        session_read_timeout: seconds(
            cfg,
            "session_read_timeout",
            DEFAULT_SESSION_READ_TIMEOUT_SECS,
        )?,
        terminate_on_close: cfg
            .get("terminate_on_close")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    })
}

fn parse_stdio_params(cfg: &Map<String, Value>) -> McpResult<StdioServerParams> {
    let command = cfg
        .get("command")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            McpError::InvalidConfig("stdio server requires a `command` (or set `url`)".to_string())
        })?
        .to_string();

    let args = match cfg.get("args") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|a| match a {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(McpError::InvalidConfig(format!(
                    "`args` entries must be strings, got {}",
                    other
                ))),
            })
            .collect::<McpResult<Vec<_>>>()?,
        Some(other) => {
            return Err(McpError::InvalidConfig(format!(
                "`args` must be an array, got {}",
                other
            )))
        }
    };

    Ok(StdioServerParams {
        command,
        args,
        env: string_map(cfg, "env")?,
        cwd: cfg.get("cwd").and_then(Value::as_str).map(str::to_string),
    })
}

fn string_map(cfg: &Map<String, Value>, key: &str) -> McpResult<HashMap<String, String>> {
    match cfg.get(key) {
        None | Some(Value::Null) => Ok(HashMap::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()),
        Some(other) => Err(McpError::InvalidConfig(format!(
            "`{}` must be an object, got {}",
            key, other
        ))),
    }
}

fn seconds(cfg: &Map<String, Value>, key: &str, default: f64) -> McpResult<Duration> {
    let secs = match cfg.get(key) {
        None | Some(Value::Null) => default,
        Some(v) => v.as_f64().ok_or_else(|| {
            McpError::InvalidConfig(format!("`{}` must be a number of seconds, got {}", key, v))
        })?,
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(McpError::InvalidConfig(format!(
            "`{}` must be a non-negative number of seconds",
            key
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Contents of `mcp_server.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServersFile {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stdio_when_url_absent() {
        let config = McpServerConfig::from_value(&json!({
            "command": "npx",
            "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
            "env": {"DEBUG": "1"}
        }))
        .unwrap();

        assert!(config.active);
        match config.source {
            McpServerSource::Stdio(p) => {
                assert_eq!(p.command, "npx");
                assert_eq!(p.args.len(), 3);
                assert_eq!(p.env.get("DEBUG").map(String::as_str), Some("1"));
            }
            other => panic!("expected stdio, got {:?}", other),
        }
    }

    #[test]
    fn test_first_mcp_servers_entry_is_unwrapped() {
        let config = McpServerConfig::from_value(&json!({
            "mcpServers": {
                "search": {"url": "http://localhost:8000/sse", "active": false},
                "other": {"command": "other"}
            }
        }))
        .unwrap();

        assert!(!config.active);
        assert_eq!(config.source.transport_name(), "sse");
    }

    #[test]
    fn test_url_transport_defaults() {
        let config = McpServerConfig::from_value(&json!({"url": "http://localhost/sse"})).unwrap();
        let McpServerSource::Url(p) = config.source else {
            panic!("expected url source");
        };
        assert_eq!(p.transport, TransportKind::Sse);
        assert_eq!(p.timeout, Duration::from_secs(5));
        assert_eq!(p.probe_timeout, Duration::from_secs(10));
        assert_eq!(p.sse_read_timeout, Duration::from_secs(300));
        assert_eq!(p.session_read_timeout, Duration::from_secs(20));
        assert!(p.terminate_on_close);
    }

    #[test]
    fn test_streamable_http_with_overrides() {
        let config = McpServerConfig::from_value(&json!({
            "url": "https://tools.example.com/mcp",
            "transport": "streamable_http",
            "headers": {"Authorization": "Bearer abc"},
            "timeout": 12,
            "session_read_timeout": 2.5,
            "terminate_on_close": false
        }))
        .unwrap();
        let McpServerSource::Url(p) = config.source else {
            panic!("expected url source");
        };
        assert_eq!(p.transport, TransportKind::StreamableHttp);
        assert_eq!(p.timeout, Duration::from_secs(12));
        assert_eq!(p.probe_timeout, Duration::from_secs(12));
        assert_eq!(p.session_read_timeout, Duration::from_millis(2500));
        assert_eq!(p.headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
        assert!(!p.terminate_on_close);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(McpServerConfig::from_value(&json!("nope")).is_err());
        assert!(McpServerConfig::from_value(&json!({"args": ["x"]})).is_err());
        assert!(McpServerConfig::from_value(&json!({"url": "http://x", "transport": "ws"})).is_err());
        assert!(McpServerConfig::from_value(&json!({"url": "http://x", "timeout": -1})).is_err());
    }

    #[test]
    fn test_servers_file_keeps_order() {
        let file: McpServersFile = serde_json::from_value(json!({
            "mcpServers": {"b": {"command": "b"}, "a": {"command": "a"}}
        }))
        .unwrap();
        let names: Vec<_> = file.mcp_servers.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(is_active(&file.mcp_servers["a"]));
    }
}

//! One-shot reachability check for URL-based MCP servers

use astrbot_mcp_core::{McpError, McpResult, TransportKind, UrlServerParams};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::HashMap;
use tracing::debug;

const PROBE_ACCEPT: &str = "application/json, text/event-stream";

/// Protocol version sent in the streamable HTTP probe
pub const PROBE_PROTOCOL_VERSION: &str = "2024-11-05";

/// Issue a single request against the server URL and require HTTP 200.
///
/// SSE servers get a `GET`; streamable HTTP servers get a JSON-RPC
/// `initialize` `POST`. The request is bounded by `probe_timeout`.
pub async fn check_reachable(params: &UrlServerParams) -> McpResult<()> {
    let client = reqwest::Client::builder()
        .timeout(params.probe_timeout)
        .build()
        .map_err(|e| McpError::Internal(format!("failed to build HTTP client: {}", e)))?;
    let headers = header_map(&params.headers)?;

    let request = match params.transport {
        TransportKind::Sse => client
            .get(&params.url)
            .headers(headers)
            .header(ACCEPT, PROBE_ACCEPT),
        TransportKind::StreamableHttp => client
            .post(&params.url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, PROBE_ACCEPT)
            .json(&initialize_payload()),
    };

    debug!("Probing MCP server at {}", params.url);
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            McpError::Timeout(params.probe_timeout.as_secs())
        } else {
            McpError::ConnectionError(e.to_string())
        }
    })?;

    check_status(response.status())
}

fn check_status(status: StatusCode) -> McpResult<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(McpError::ConnectionError(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )))
    }
}

fn initialize_payload() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "id": 0,
        "params": {
            "protocolVersion": PROBE_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "astrbot-probe", "version": env!("CARGO_PKG_VERSION")}
        }
    })
}

/// Convert configured headers, rejecting names or values HTTP cannot carry
pub(crate) fn header_map(headers: &HashMap<String, String>) -> McpResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| McpError::InvalidConfig(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| McpError::InvalidConfig(format!("invalid value for header {}", name)))?;
        map.insert(name, value);
    }
    Ok(map)
}

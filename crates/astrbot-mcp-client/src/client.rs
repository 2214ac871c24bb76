//! A single MCP server connection
//!
//! [`McpClient`] owns one rmcp session plus the resources opened to reach it
//! (the stderr forwarding task for a subprocess, the running service). They
//! are kept on an exit stack and released in reverse order, both when
//! `connect` fails halfway and on [`McpClient::cleanup`].

use crate::handler::LoggingClient;
use crate::log_pipe::{self, ErrLog};
use crate::probe;
use astrbot_mcp_core::{
    ContentBlock, McpError, McpResult, McpServerConfig, McpServerSource, McpToolCaller,
    McpToolInfo, ResourceContents, StdioServerParams, ToolResult, TransportKind, UrlServerParams,
};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, Content, RawContent};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::sse_client::SseClientConfig;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{SseClientTransport, StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Session = RunningService<RoleClient, LoggingClient>;

/// How long cleanup waits for the stderr task to drain after the session ends
const LOG_PIPE_DRAIN: Duration = Duration::from_secs(1);

enum ExitResource {
    LogPipe(JoinHandle<()>),
    Session(Session),
}

/// Resources opened during `connect`, closed last-in first-out
#[derive(Default)]
struct ExitStack {
    resources: Vec<ExitResource>,
}

impl ExitStack {
    fn push(&mut self, resource: ExitResource) {
        self.resources.push(resource);
    }

    async fn close(&mut self, name: &str) {
        while let Some(resource) = self.resources.pop() {
            match resource {
                ExitResource::Session(session) => {
                    if let Err(e) = session.cancel().await {
                        warn!("MCP server {} session did not shut down cleanly: {}", name, e);
                    }
                }
                ExitResource::LogPipe(mut handle) => {
                    if tokio::time::timeout(LOG_PIPE_DRAIN, &mut handle).await.is_err() {
                        handle.abort();
                    }
                }
            }
        }
    }
}

/// Connection to one MCP server
pub struct McpClient {
    name: String,
    peer: RwLock<Option<Peer<RoleClient>>>,
    exit_stack: Mutex<ExitStack>,
    tools: RwLock<Vec<McpToolInfo>>,
    session_read_timeout: RwLock<Option<Duration>>,
    errlogs: ErrLog,
    closed: watch::Sender<bool>,
}

impl McpClient {
    /// Create an unconnected client for the server registered as `name`
    pub fn new(name: impl Into<String>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            name: name.into(),
            peer: RwLock::new(None),
            exit_stack: Mutex::new(ExitStack::default()),
            tools: RwLock::new(Vec::new()),
            session_read_timeout: RwLock::new(None),
            errlogs: ErrLog::default(),
            closed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open the transport and complete the MCP handshake.
    ///
    /// On failure everything opened so far is released before the error is
    /// returned.
    pub async fn connect(&self, config: &McpServerConfig) -> McpResult<()> {
        let mut stack = self.exit_stack.lock().await;
        if self.peer.read().await.is_some() {
            return Err(McpError::Internal(format!(
                "MCP client {} is already connected",
                self.name
            )));
        }

        info!(
            "Connecting to MCP server {} over {}",
            self.name,
            config.source.transport_name()
        );

        let opened = match &config.source {
            McpServerSource::Stdio(params) => self.open_stdio(params, &mut stack).await,
            McpServerSource::Url(params) => self.open_url(params).await,
        };

        match opened {
            Ok((session, read_timeout)) => {
                *self.peer.write().await = Some(session.peer().clone());
                *self.session_read_timeout.write().await = read_timeout;
                stack.push(ExitResource::Session(session));
                self.closed.send_replace(false);
                info!("Connected to MCP server {}", self.name);
                Ok(())
            }
            Err(e) => {
                stack.close(&self.name).await;
                Err(e)
            }
        }
    }

    async fn open_stdio(
        &self,
        params: &StdioServerParams,
        stack: &mut ExitStack,
    ) -> McpResult<(Session, Option<Duration>)> {
        let mut command = Command::new(&params.command);
        command.args(&params.args).envs(&params.env);
        if let Some(cwd) = &params.cwd {
            command.current_dir(cwd);
        }

        let (transport, stderr) = TokioChildProcess::builder(command)
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stderr) = stderr {
            stack.push(ExitResource::LogPipe(log_pipe::spawn(
                stderr,
                format!("MCPServer-{}", self.name),
                self.errlogs.clone(),
            )));
        }

        let session = self
            .session_handler()
            .serve(transport)
            .await
            .map_err(|e| McpError::ConnectionError(e.to_string()))?;
        Ok((session, None))
    }

    fn session_handler(&self) -> LoggingClient {
        LoggingClient::new(format!("MCPServer-{}", self.name), self.errlogs.clone())
    }

    async fn open_url(&self, params: &UrlServerParams) -> McpResult<(Session, Option<Duration>)> {
        probe::check_reachable(params).await?;

        let http = reqwest::Client::builder()
            .default_headers(probe::header_map(&params.headers)?)
            .connect_timeout(params.timeout)
            .read_timeout(params.sse_read_timeout)
            .build()
            .map_err(|e| McpError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let session = match params.transport {
            TransportKind::Sse => {
                let transport = SseClientTransport::start_with_client(
                    http,
                    SseClientConfig {
                        sse_endpoint: params.url.as_str().into(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| McpError::ConnectionError(e.to_string()))?;
                self.session_handler()
                    .serve(transport)
                    .await
                    .map_err(|e| McpError::ConnectionError(e.to_string()))?
            }
            TransportKind::StreamableHttp => {
                if !params.terminate_on_close {
                    debug!(
                        "MCP server {}: terminate_on_close=false, session is still deleted on shutdown",
                        self.name
                    );
                }
                let transport = StreamableHttpClientTransport::with_client(
                    http,
                    StreamableHttpClientTransportConfig::with_uri(params.url.clone()),
                );
                self.session_handler()
                    .serve(transport)
                    .await
                    .map_err(|e| McpError::ConnectionError(e.to_string()))?
            }
        };

        Ok((session, Some(params.session_read_timeout)))
    }

    async fn peer(&self) -> McpResult<Peer<RoleClient>> {
        self.peer
            .read()
            .await
            .clone()
            .ok_or_else(|| McpError::NotConnected(self.name.clone()))
    }

    /// Discover the server's tools and cache them
    pub async fn list_tools_and_save(&self) -> McpResult<Vec<McpToolInfo>> {
        let peer = self.peer().await?;
        let raw_tools = peer
            .list_all_tools()
            .await
            .map_err(|e| McpError::ProtocolError(e.to_string()))?;

        let tools: Vec<McpToolInfo> = raw_tools
            .into_iter()
            .map(|t| McpToolInfo {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema: serde_json::Value::Object((*t.input_schema).clone()),
            })
            .collect();

        debug!("MCP server {} offers {} tools", self.name, tools.len());
        *self.tools.write().await = tools.clone();
        Ok(tools)
    }

    /// Tools cached by the last [`list_tools_and_save`](Self::list_tools_and_save)
    pub async fn tools(&self) -> Vec<McpToolInfo> {
        self.tools.read().await.clone()
    }

    /// Invoke a remote tool, bounded by the session read timeout
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpResult<ToolResult> {
        let peer = self.peer().await?;
        let request = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: arguments.as_object().cloned(),
        };

        let read_timeout = *self.session_read_timeout.read().await;
        let call = peer.call_tool(request);
        let result = match read_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| McpError::Timeout(limit.as_secs()))?,
            None => call.await,
        }
        .map_err(|e| McpError::ToolExecutionFailed {
            tool: name.to_string(),
            message: e.to_string(),
        })?;

        Ok(convert_result(result))
    }

    /// Recent error output of the server: stderr lines of a subprocess and
    /// log messages sent over the session, oldest first
    pub async fn server_errlogs(&self) -> Vec<String> {
        self.errlogs.lines().await
    }

    /// Release every resource and signal completion
    pub async fn cleanup(&self) {
        let mut stack = self.exit_stack.lock().await;
        self.peer.write().await.take();
        stack.close(&self.name).await;
        self.closed.send_replace(true);
        debug!("MCP client {} cleaned up", self.name);
    }

    /// Resolve once [`cleanup`](Self::cleanup) has finished
    pub async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    pub async fn is_connected(&self) -> bool {
        self.peer.read().await.is_some()
    }
}

#[async_trait]
impl McpToolCaller for McpClient {
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpResult<Option<ToolResult>> {
        McpClient::call_tool(self, name, arguments).await.map(Some)
    }
}

fn convert_result(result: CallToolResult) -> ToolResult {
    ToolResult {
        content: result.content.iter().filter_map(convert_content).collect(),
        is_error: result.is_error.unwrap_or(false),
    }
}

fn convert_content(content: &Content) -> Option<ContentBlock> {
    match &content.raw {
        RawContent::Text(t) => Some(ContentBlock::Text {
            text: t.text.clone(),
        }),
        RawContent::Image(i) => Some(ContentBlock::Image {
            data: i.data.clone(),
            mime_type: i.mime_type.clone(),
        }),
        RawContent::Resource(r) => {
            let resource = match &r.resource {
                rmcp::model::ResourceContents::TextResourceContents {
                    uri,
                    mime_type,
                    text,
                    ..
                } => ResourceContents::Text {
                    uri: uri.clone(),
                    mime_type: mime_type.clone(),
                    text: text.clone(),
                },
                rmcp::model::ResourceContents::BlobResourceContents {
                    uri,
                    mime_type,
                    blob,
                    ..
                } => ResourceContents::Blob {
                    uri: uri.clone(),
                    mime_type: mime_type.clone(),
                    blob: blob.clone(),
                },
            };
            Some(ContentBlock::Resource { resource })
        }
        _ => convert_wire_content(content),
    }
}

/// Audio and resource links, read from their MCP wire form
fn convert_wire_content(content: &Content) -> Option<ContentBlock> {
    let value = serde_json::to_value(content).ok()?;
    let field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
    match value.get("type").and_then(|t| t.as_str()) {
        Some("audio") => Some(ContentBlock::Audio {
            data: field("data")?,
            mime_type: field("mimeType").unwrap_or_default(),
        }),
        Some("resource_link") => Some(ContentBlock::ResourceLink { uri: field("uri")? }),
        other => {
            debug!("Skipping unknown MCP content type {:?}", other);
            None
        }
    }
}

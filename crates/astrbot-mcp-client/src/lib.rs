//! AstrBot MCP Client - one connection to one Model Context Protocol server
//!
//! The transport is picked from the server config:
//!
//! - **stdio**: no `url` key; the server is spawned as a subprocess and its
//!   stderr is forwarded to `tracing` and kept in [`McpClient::server_errlogs`]
//! - **SSE**: `url` present, `transport` absent or `"sse"`
//! - **Streamable HTTP**: `url` present, `transport` = `"streamable_http"`
//!
//! Log messages a server sends over the session land in the same error log,
//! whatever the transport.
//!
//! URL transports are probed with one plain HTTP request first so that an
//! unreachable server fails within its `timeout` instead of hanging the
//! handshake.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use astrbot_mcp_client::McpClient;
//! use astrbot_mcp_core::McpServerConfig;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = McpServerConfig::from_value(&json!({
//!         "url": "http://localhost:8000/sse"
//!     }))?;
//!
//!     let client = McpClient::new("search");
//!     client.connect(&config).await?;
//!
//!     let tools = client.list_tools_and_save().await?;
//!     println!("Found {} tools", tools.len());
//!
//!     client.cleanup().await;
//!     Ok(())
//! }
//! ```

mod client;
mod handler;
mod log_pipe;
pub mod probe;

pub use client::McpClient;

// Re-export core types for convenience
pub use astrbot_mcp_core::{
    McpError, McpResult, McpServerConfig, McpServerSource, McpToolCaller, McpToolInfo, ToolResult,
};

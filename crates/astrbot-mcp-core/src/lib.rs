//! AstrBot MCP Core - Shared types for Model Context Protocol tool servers
//!
//! This crate provides the foundational pieces used by:
//! - `astrbot-mcp-client` - one connection to one MCP server
//! - `astrbot-agent` - the tool-calling runtime that forwards calls to MCP servers
//!
//! # Configuration
//!
//! Server entries use the same JSON shape as `mcp_server.json`. Either a
//! wrapped object (the first entry is used) or a flat server object:
//!
//! ```rust
//! use astrbot_mcp_core::{McpServerConfig, McpServerSource};
//! use serde_json::json;
//!
//! let config = McpServerConfig::from_value(&json!({
//!     "mcpServers": {
//!         "fetch": { "command": "uvx", "args": ["mcp-server-fetch"] }
//!     }
//! }))
//! .unwrap();
//!
//! assert!(matches!(config.source, McpServerSource::Stdio(_)));
//! ```

mod config;
mod error;
mod traits;
mod types;

pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;

//! Error types for the agent runtime

use astrbot_mcp_core::McpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("tool {tool_name} execution timeout after {timeout_secs} seconds.")]
    ToolTimeout { tool_name: String, timeout_secs: f64 },

    #[error("Tool error: {tool_name}: {message}")]
    ToolError { tool_name: String, message: String },

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Agent configuration error: {0}")]
    Configuration(String),

    #[error("Request is not set. Please call reset() first.")]
    NotReset,

    #[error("Handoff depth limit of {0} exceeded")]
    HandoffDepthExceeded(usize),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

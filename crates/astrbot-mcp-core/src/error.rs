//! Error types for MCP operations

use thiserror::Error;

/// Errors that can occur during MCP operations
#[derive(Debug, Error)]
pub enum McpError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution failed: {tool} - {message}")]
    ToolExecutionFailed { tool: String, message: String },

    /// Server configuration could not be interpreted
    #[error("Invalid MCP server config: {0}")]
    InvalidConfig(String),

    /// Connection error (probe, handshake or transport setup)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Timeout
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// The client has no live session
    #[error("MCP client {0} is not connected")]
    NotConnected(String),

    /// I/O error (process spawn, config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::SerializationError(err.to_string())
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

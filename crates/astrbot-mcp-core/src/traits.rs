//! Seam between the agent runtime and whatever owns an MCP session

use async_trait::async_trait;

use crate::{McpResult, ToolResult};

/// Something that can invoke a tool on a remote MCP server
///
/// Implemented by `astrbot_mcp_client::McpClient`. The agent runtime only
/// depends on this trait, so tests can substitute an in-process stub.
#[async_trait]
pub trait McpToolCaller: Send + Sync {
    /// Call a remote tool. `Ok(None)` means the server returned nothing.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpResult<Option<ToolResult>>;
}

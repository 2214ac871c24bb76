//! Lifecycle hooks invoked by the runner
//!
//! Errors returned from a hook are logged and ignored; they never change the
//! state of the turn.

use crate::context::RunContext;
use crate::errors::Result;
use crate::provider::LLMResponse;
use crate::tool::FunctionTool;
use astrbot_mcp_core::ToolResult;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait AgentRunHooks: Send + Sync {
    /// Before the first LLM request of a turn
    async fn on_agent_begin(&self, _run_context: &RunContext) -> Result<()> {
        Ok(())
    }

    async fn on_tool_start(
        &self,
        _run_context: &RunContext,
        _tool: &FunctionTool,
        _tool_args: &Value,
    ) -> Result<()> {
        Ok(())
    }

    /// After a tool call; `tool_result` is the last result it produced
    async fn on_tool_end(
        &self,
        _run_context: &RunContext,
        _tool: &FunctionTool,
        _tool_args: &Value,
        _tool_result: Option<&ToolResult>,
    ) -> Result<()> {
        Ok(())
    }

    /// When the turn ends with a final answer
    async fn on_agent_done(&self, _run_context: &RunContext, _llm_response: &LLMResponse) -> Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

#[async_trait]
impl AgentRunHooks for NoopHooks {}

//! AstrBot Agent - Tool-calling agent runtime
//!
//! This crate drives a conversational turn between a chat platform, an LLM
//! provider and tools. The model may call local plugin tools, tools hosted on
//! MCP servers, or hand the task off to another agent.
//!
//! # Example
//!
//! ```no_run
//! use astrbot_agent::prelude::*;
//! use futures::StreamExt;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! async fn answer(provider: Arc<dyn Provider>, event: Arc<dyn EventContext>) -> anyhow::Result<()> {
//!     let clock = FunctionTool::new("clock", "Current time", json!({"type": "object"}))?
//!         .handler_fn(|_inv| async { Ok(Some(ToolOutput::text("12:00"))) });
//!
//!     let mut tools = ToolSet::new();
//!     tools.add_tool(clock);
//!     let request = ProviderRequest::new("What time is it?").with_tools(tools);
//!
//!     let config = RunConfig::default();
//!     let run_context = config.run_context(AgentContext::new(provider.clone(), event));
//!
//!     let mut runner = ToolLoopAgentRunner::new();
//!     runner.reset(
//!         provider,
//!         request,
//!         run_context,
//!         Arc::new(config.executor(None)),
//!         Arc::new(NoopHooks),
//!         config.streaming,
//!     );
//!
//!     let mut outputs = run_agent(&mut runner, config.run_options());
//!     while let Some(output) = outputs.next().await {
//!         if let RunOutput::Final { chain, .. } = output {
//!             println!("{}", chain.plain_text());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chain;
pub mod config;
pub mod context;
pub mod errors;
pub mod executor;
pub mod handoff;
pub mod hooks;
pub mod manager;
pub mod message;
pub mod provider;
pub mod response;
pub mod run;
pub mod runner;
pub mod tool;
pub mod tool_set;

pub use agent::{Agent, AgentBuilder, ToolRef};
pub use chain::{ChainKind, Component, MessageChain};
pub use config::RunConfig;
pub use context::{AgentContext, EventContext, HandoffStack, RunContext};
pub use errors::{AgentError, Result};
pub use executor::{normalize_result, FunctionToolExecutor, ToolExecOutput, ToolExecutor};
pub use handoff::handoff_tool;
pub use hooks::{AgentRunHooks, NoopHooks};
pub use manager::{FuncArg, FunctionToolManager};
pub use message::{Message, MessageContent, Role, ToolCall, ToolCallsResult};
pub use provider::{LLMResponse, LlmRole, Provider, ProviderRequest};
pub use response::{AgentResponse, AgentResponseKind, AgentState};
pub use run::{run_agent, ResultContentType, RunAgentOptions, RunOutput};
pub use runner::ToolLoopAgentRunner;
pub use tool::{FunctionTool, RunnableTool, ToolHandler, ToolInvocation, ToolKind, ToolOrigin, ToolOutput};
pub use tool_set::ToolSet;

// Re-export core types for convenience
pub use astrbot_mcp_core::{ContentBlock, McpToolCaller, ToolResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        run_agent, Agent, AgentBuilder, AgentContext, AgentError, AgentRunHooks, EventContext,
        FunctionTool, FunctionToolExecutor, FunctionToolManager, LLMResponse, MessageChain,
        NoopHooks, Provider, ProviderRequest, RunConfig, RunContext, RunOutput,
        ToolLoopAgentRunner, ToolOutput, ToolResult, ToolSet,
    };
}

//! Tool execution
//!
//! [`FunctionToolExecutor`] dispatches a [`FunctionTool`] by its kind: local
//! handlers run under the per-call timeout, MCP tools are forwarded to their
//! server and handoff tools run a nested agent turn.

use crate::chain::{ChainKind, MessageChain};
use crate::context::RunContext;
use crate::errors::{AgentError, Result};
use crate::handoff;
use crate::manager::FunctionToolManager;
use crate::message::Message;
use crate::tool::{FunctionTool, LocalTool, McpTool, ToolInvocation, ToolKind, ToolOutput};
use astrbot_mcp_core::{ContentBlock, ResourceContents, ToolResult};
use async_stream::stream;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Steps granted to each delegated agent
pub const DEFAULT_HANDOFF_MAX_STEPS: usize = 15;

const IMAGE_PLACEHOLDER: &str = "returned an image (sent directly to the user)";
const UNSUPPORTED_PLACEHOLDER: &str = "the returned data type is not supported";

/// One item of an executor stream
#[derive(Debug, Clone, PartialEq)]
pub enum ToolExecOutput {
    /// A result to feed back to the model
    Result(ToolResult),
    /// The tool already delivered a chain to the user
    Sent,
    /// The tool finished without output
    Empty,
}

/// Runs tools on behalf of the runner
pub trait ToolExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        tool: &'a FunctionTool,
        run_context: &'a RunContext,
        args: Value,
    ) -> BoxStream<'a, Result<ToolExecOutput>>;
}

/// Default executor for local, MCP and handoff tools
#[derive(Clone)]
pub struct FunctionToolExecutor {
    registry: Option<Arc<FunctionToolManager>>,
    handoff_max_steps: usize,
}

impl FunctionToolExecutor {
    pub fn new() -> Self {
        Self {
            registry: None,
            handoff_max_steps: DEFAULT_HANDOFF_MAX_STEPS,
        }
    }

    /// Resolve tools named by handoff agents through `registry`
    pub fn with_registry(mut self, registry: Arc<FunctionToolManager>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_handoff_max_steps(mut self, steps: usize) -> Self {
        self.handoff_max_steps = steps;
        self
    }

    pub fn registry(&self) -> Option<&Arc<FunctionToolManager>> {
        self.registry.as_ref()
    }

    pub fn handoff_max_steps(&self) -> usize {
        self.handoff_max_steps
    }

    fn execute_local<'a>(
        &'a self,
        tool: &'a FunctionTool,
        local: &'a LocalTool,
        run_context: &'a RunContext,
        args: Value,
    ) -> BoxStream<'a, Result<ToolExecOutput>> {
        let timeout = run_context.tool_call_timeout;
        stream! {
            let mut outputs: BoxStream<'a, Result<ToolOutput>> = if let Some(handler) = &local.handler {
                handler(ToolInvocation {
                    context: run_context.context.clone(),
                    args,
                })
            } else if let Some(runnable) = &local.runnable {
                stream::once(runnable.run(run_context, args))
                    .filter_map(|res| async move { res.transpose() })
                    .boxed()
            } else {
                yield Err(AgentError::InvalidArguments(format!(
                    "tool {} has neither a handler nor a run method",
                    tool.name
                )));
                return;
            };

            let mut produced = false;
            loop {
                let next = match tokio::time::timeout(timeout, outputs.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(timeout_error(&tool.name, timeout));
                        return;
                    }
                };
                let Some(item) = next else { break };
                produced = true;
                match item {
                    Ok(ToolOutput::Result(result)) => yield Ok(ToolExecOutput::Result(result)),
                    Ok(ToolOutput::Send(chain)) => {
                        deliver(run_context, chain).await;
                        yield Ok(ToolExecOutput::Sent);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if !produced {
                yield Ok(ToolExecOutput::Empty);
            }
        }
        .boxed()
    }

    fn execute_mcp<'a>(
        &'a self,
        tool: &'a FunctionTool,
        mcp: &'a McpTool,
        run_context: &'a RunContext,
        args: Value,
    ) -> BoxStream<'a, Result<ToolExecOutput>> {
        let timeout = run_context.tool_call_timeout;
        stream! {
            debug!(server = %mcp.server_name, tool = %mcp.remote_name, "forwarding MCP tool call");
            match tokio::time::timeout(timeout, mcp.client.call_tool(&mcp.remote_name, args)).await {
                Err(_) => yield Err(timeout_error(&tool.name, timeout)),
                Ok(Err(e)) => yield Err(e.into()),
                Ok(Ok(Some(result))) => yield Ok(ToolExecOutput::Result(result)),
                Ok(Ok(None)) => {}
            }
        }
        .boxed()
    }
}

impl Default for FunctionToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolExecutor for FunctionToolExecutor {
    fn execute<'a>(
        &'a self,
        tool: &'a FunctionTool,
        run_context: &'a RunContext,
        args: Value,
    ) -> BoxStream<'a, Result<ToolExecOutput>> {
        match &tool.kind {
            ToolKind::Local(local) => self.execute_local(tool, local, run_context, args),
            ToolKind::Mcp(mcp) => self.execute_mcp(tool, mcp, run_context, args),
            ToolKind::Handoff(agent) => stream::once(async move {
                handoff::run_handoff(self, agent, tool, run_context, &args)
                    .await
                    .map(ToolExecOutput::Result)
            })
            .boxed(),
        }
    }
}

fn timeout_error(tool_name: &str, timeout: Duration) -> AgentError {
    AgentError::ToolTimeout {
        tool_name: tool_name.to_string(),
        timeout_secs: timeout.as_secs_f64(),
    }
}

async fn deliver(run_context: &RunContext, chain: MessageChain) {
    let event = run_context.event();
    event.set_result(chain.clone());
    if let Err(e) = event.send(chain.into_kind(ChainKind::ToolDirectResult)).await {
        error!("failed to send tool output to the user: {}", e);
    }
    event.clear_result();
}

/// Turn a tool result into the tool segment for the model and the chain
/// shown to the user
///
/// Only the first content block is considered.
pub fn normalize_result(tool_call_id: &str, result: &ToolResult) -> (Message, MessageChain) {
    match result.content.first() {
        Some(ContentBlock::Text { text }) => (
            Message::tool(tool_call_id, text.as_str()),
            MessageChain::new().message(text.as_str()),
        ),
        Some(ContentBlock::Image { data, .. }) => direct_image(tool_call_id, data),
        Some(ContentBlock::Resource {
            resource: ResourceContents::Text { text, .. },
        }) => (
            Message::tool(tool_call_id, text.as_str()),
            MessageChain::new().message(text.as_str()),
        ),
        Some(ContentBlock::Resource {
            resource: ResourceContents::Blob { blob, mime_type, .. },
        }) if mime_type.as_deref().is_some_and(|m| m.starts_with("image/")) => {
            direct_image(tool_call_id, blob)
        }
        other => {
            warn!("unsupported tool result content: {:?}", other);
            (
                Message::tool(tool_call_id, UNSUPPORTED_PLACEHOLDER),
                MessageChain::new().message(format!("{}.", UNSUPPORTED_PLACEHOLDER)),
            )
        }
    }
}

fn direct_image(tool_call_id: &str, data: &str) -> (Message, MessageChain) {
    (
        Message::tool(tool_call_id, IMAGE_PLACEHOLDER),
        MessageChain::with_kind(ChainKind::ToolDirectResult).base64_image(data),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Component;

    #[test]
    fn test_normalize_text() {
        let (msg, chain) = normalize_result("c1", &ToolResult::text("sunny"));
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.content.text(), "sunny");
        assert_eq!(chain.kind, ChainKind::Normal);
        assert_eq!(chain.plain_text(), "sunny");
    }

    #[test]
    fn test_normalize_image_goes_direct() {
        let (msg, chain) = normalize_result("c1", &ToolResult::image("aGVsbG8=", "image/png"));
        assert_eq!(msg.content.text(), IMAGE_PLACEHOLDER);
        assert_eq!(chain.kind, ChainKind::ToolDirectResult);
        assert_eq!(
            chain.components,
            vec![Component::Base64Image {
                data: "aGVsbG8=".to_string()
            }]
        );
    }

    #[test]
    fn test_normalize_resources() {
        let text = ToolResult {
            content: vec![ContentBlock::Resource {
                resource: ResourceContents::Text {
                    uri: "file:///a.txt".to_string(),
                    mime_type: None,
                    text: "contents".to_string(),
                },
            }],
            is_error: false,
        };
        assert_eq!(normalize_result("c", &text).0.content.text(), "contents");

        let image_blob = ToolResult {
            content: vec![ContentBlock::Resource {
                resource: ResourceContents::Blob {
                    uri: "file:///a.png".to_string(),
                    mime_type: Some("image/png".to_string()),
                    blob: "cG5n".to_string(),
                },
            }],
            is_error: false,
        };
        let (msg, chain) = normalize_result("c", &image_blob);
        assert_eq!(msg.content.text(), IMAGE_PLACEHOLDER);
        assert_eq!(chain.kind, ChainKind::ToolDirectResult);

        let pdf_blob = ToolResult {
            content: vec![ContentBlock::Resource {
                resource: ResourceContents::Blob {
                    uri: "file:///a.pdf".to_string(),
                    mime_type: Some("application/pdf".to_string()),
                    blob: "cGRm".to_string(),
                },
            }],
            is_error: false,
        };
        assert_eq!(normalize_result("c", &pdf_blob).0.content.text(), UNSUPPORTED_PLACEHOLDER);
    }

    #[test]
    fn test_normalize_unsupported() {
        let audio = ToolResult {
            content: vec![ContentBlock::Audio {
                data: "AAAA".to_string(),
                mime_type: "audio/wav".to_string(),
            }],
            is_error: false,
        };
        let (msg, chain) = normalize_result("c", &audio);
        assert_eq!(msg.content.text(), UNSUPPORTED_PLACEHOLDER);
        assert_eq!(chain.kind, ChainKind::Normal);

        let empty = ToolResult {
            content: vec![],
            is_error: false,
        };
        assert_eq!(normalize_result("c", &empty).0.content.text(), UNSUPPORTED_PLACEHOLDER);
    }
}

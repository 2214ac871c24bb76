//! Tool-loop agent runner
//!
//! [`ToolLoopAgentRunner`] drives one conversational turn as a state
//! machine. Each call to [`step`](ToolLoopAgentRunner::step) requests the
//! model once, executes any requested tools in order and feeds their results
//! back into the request, so the next step continues the loop:
//!
//! ```text
//! IDLE --step--> RUNNING --final answer--> DONE
//!                   |  \--error response--> ERROR
//!                   \--tool calls--> RUNNING
//! ```

use crate::chain::MessageChain;
use crate::context::RunContext;
use crate::errors::{AgentError, Result};
use crate::executor::{normalize_result, ToolExecOutput, ToolExecutor};
use crate::hooks::AgentRunHooks;
use crate::message::{Message, ToolCallsResult};
use crate::provider::{LLMResponse, LlmRole, Provider, ProviderRequest};
use crate::response::{AgentResponse, AgentResponseKind, AgentState};
use astrbot_mcp_core::ToolResult;
use async_stream::stream;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const SENT_PLACEHOLDER: &str = "the result was sent directly to the user";
const NO_RESULT_PLACEHOLDER: &str = "no result";

struct Turn {
    provider: Arc<dyn Provider>,
    request: ProviderRequest,
    run_context: RunContext,
    executor: Arc<dyn ToolExecutor>,
    hooks: Arc<dyn AgentRunHooks>,
    streaming: bool,
}

/// Runs the model/tool loop for one turn
pub struct ToolLoopAgentRunner {
    state: AgentState,
    final_llm_resp: Option<LLMResponse>,
    turn: Option<Turn>,
}

impl ToolLoopAgentRunner {
    pub fn new() -> Self {
        Self {
            state: AgentState::Idle,
            final_llm_resp: None,
            turn: None,
        }
    }

    /// Prepare a new turn, discarding any previous one
    pub fn reset(
        &mut self,
        provider: Arc<dyn Provider>,
        request: ProviderRequest,
        run_context: RunContext,
        tool_executor: Arc<dyn ToolExecutor>,
        agent_hooks: Arc<dyn AgentRunHooks>,
        streaming: bool,
    ) {
        self.state = AgentState::Idle;
        self.final_llm_resp = None;
        self.turn = Some(Turn {
            provider,
            request,
            run_context,
            executor: tool_executor,
            hooks: agent_hooks,
            streaming,
        });
    }

    /// Advance the turn by one model round trip
    ///
    /// Fails with [`AgentError::NotReset`] before the first
    /// [`reset`](Self::reset). Once the runner is done the returned stream is
    /// empty.
    pub fn step(&mut self) -> Result<BoxStream<'_, AgentResponse>> {
        let Self {
            state,
            final_llm_resp,
            turn,
        } = self;
        let turn = turn.as_mut().ok_or(AgentError::NotReset)?;
        if matches!(*state, AgentState::Done | AgentState::Error) {
            return Ok(stream::empty().boxed());
        }

        let provider = turn.provider.clone();
        let hooks = turn.hooks.clone();
        let executor = turn.executor.clone();
        let streaming = turn.streaming;

        Ok(stream! {
            if *state == AgentState::Idle {
                if let Err(e) = hooks.on_agent_begin(&turn.run_context).await {
                    error!("error in on_agent_begin hook: {}", e);
                }
            }
            transition(state, AgentState::Running);

            let mut final_resp = None;
            if streaming {
                match provider.text_chat_stream(&turn.request).await {
                    Ok(mut chunks) => {
                        while let Some(item) = chunks.next().await {
                            let resp = item.unwrap_or_else(|e| LLMResponse::err(e.to_string()));
                            if resp.is_chunk {
                                yield AgentResponse::new(AgentResponseKind::StreamingDelta, delta_chain(resp));
                                continue;
                            }
                            final_resp = Some(resp);
                            break;
                        }
                    }
                    Err(e) => final_resp = Some(LLMResponse::err(e.to_string())),
                }
            } else {
                let resp = provider
                    .text_chat(&turn.request)
                    .await
                    .unwrap_or_else(|e| LLMResponse::err(e.to_string()));
                final_resp = Some(resp);
            }

            let Some(resp) = final_resp else {
                return;
            };

            if resp.role == LlmRole::Err {
                let reason = if resp.completion_text.is_empty() {
                    "unknown error".to_string()
                } else {
                    resp.completion_text.clone()
                };
                *final_llm_resp = Some(resp);
                transition(state, AgentState::Error);
                yield AgentResponse::text(AgentResponseKind::Err, format!("LLM response error: {}", reason));
                return;
            }

            if !resp.has_tool_calls() {
                *final_llm_resp = Some(resp.clone());
                transition(state, AgentState::Done);
                if let Err(e) = hooks.on_agent_done(&turn.run_context, &resp).await {
                    error!("error in on_agent_done hook: {}", e);
                }
            }

            if let Some(chain) = &resp.result_chain {
                yield AgentResponse::new(AgentResponseKind::LlmResult, chain.clone());
            } else if !resp.completion_text.is_empty() {
                yield AgentResponse::text(AgentResponseKind::LlmResult, resp.completion_text.clone());
            }

            if !resp.has_tool_calls() {
                return;
            }

            for name in &resp.tools_call_name {
                yield AgentResponse::text(AgentResponseKind::ToolCall, format!("Calling tool: {}", name));
            }
            info!("agent using tools: {:?}", resp.tools_call_name);

            let mut segments = Vec::with_capacity(resp.tools_call_name.len());
            let mut direct_sent = false;

            for (i, name) in resp.tools_call_name.iter().enumerate() {
                let call_id = resp.tools_call_ids.get(i).cloned().unwrap_or_default();
                let args = resp.tools_call_args.get(i).cloned().unwrap_or_else(|| json!({}));

                let tool = turn
                    .request
                    .func_tool
                    .as_ref()
                    .and_then(|tools| tools.get_tool(name))
                    .cloned();
                let Some(tool) = tool else {
                    warn!("model requested unknown tool {}", name);
                    segments.push(error_segment(&call_id, &AgentError::ToolNotFound(name.clone())));
                    continue;
                };

                info!(tool = %name, "using tool, args: {}", args);
                if let Err(e) = hooks.on_tool_start(&turn.run_context, &tool, &args).await {
                    error!("error in on_tool_start hook: {}", e);
                }

                let mut produced = false;
                let mut sent = false;
                let mut last_result: Option<ToolResult> = None;
                {
                    let mut outputs = executor.execute(&tool, &turn.run_context, args.clone());
                    while let Some(output) = outputs.next().await {
                        match output {
                            Ok(ToolExecOutput::Result(result)) => {
                                let (segment, chain) = normalize_result(&call_id, &result);
                                segments.push(segment);
                                produced = true;
                                last_result = Some(result);
                                yield AgentResponse::new(AgentResponseKind::ToolCallResult, chain);
                            }
                            Ok(ToolExecOutput::Sent) => {
                                if !sent {
                                    segments.push(Message::tool(call_id.as_str(), SENT_PLACEHOLDER));
                                }
                                produced = true;
                                sent = true;
                            }
                            Ok(ToolExecOutput::Empty) => {}
                            Err(e) => {
                                warn!(tool = %name, "tool call failed: {}", e);
                                segments.push(error_segment(&call_id, &e));
                                produced = true;
                                break;
                            }
                        }
                    }
                }
                direct_sent |= sent;

                if let Err(e) = hooks
                    .on_tool_end(&turn.run_context, &tool, &args, last_result.as_ref())
                    .await
                {
                    error!("error in on_tool_end hook: {}", e);
                }
                if !produced {
                    segments.push(Message::tool(call_id.as_str(), NO_RESULT_PLACEHOLDER));
                }
                turn.run_context.event().clear_result();
            }

            let tool_calls_result = ToolCallsResult {
                tool_calls_info: Message::assistant_tool_calls(
                    resp.completion_text.clone(),
                    resp.to_openai_tool_calls(),
                ),
                tool_calls_result: segments,
            };
            turn.run_context
                .messages
                .extend(tool_calls_result.to_openai_messages());
            turn.request.append_tool_calls_result(tool_calls_result);

            if direct_sent {
                *final_llm_resp = Some(resp);
                transition(state, AgentState::Done);
            }
        }
        .boxed())
    }

    /// Whether the turn reached DONE or ERROR
    pub fn done(&self) -> bool {
        matches!(self.state, AgentState::Done | AgentState::Error)
    }

    pub fn get_final_llm_resp(&self) -> Option<&LLMResponse> {
        self.final_llm_resp.as_ref()
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn streaming(&self) -> bool {
        self.turn.as_ref().is_some_and(|t| t.streaming)
    }

    pub fn run_context(&self) -> Option<&RunContext> {
        self.turn.as_ref().map(|t| &t.run_context)
    }

    /// The request as it stands, including appended tool results
    pub fn request(&self) -> Option<&ProviderRequest> {
        self.turn.as_ref().map(|t| &t.request)
    }
}

impl Default for ToolLoopAgentRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn transition(state: &mut AgentState, next: AgentState) {
    if *state != next {
        debug!("agent state transition: {:?} -> {:?}", state, next);
        *state = next;
    }
}

fn delta_chain(resp: LLMResponse) -> MessageChain {
    match resp.result_chain {
        Some(chain) => chain,
        None => MessageChain::new().message(resp.completion_text),
    }
}

fn error_segment(call_id: &str, err: &AgentError) -> Message {
    Message::tool(call_id, format!("error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_runner_is_idle() {
        let runner = ToolLoopAgentRunner::new();
        assert_eq!(runner.state(), AgentState::Idle);
        assert!(!runner.done());
        assert!(!runner.streaming());
        assert!(runner.run_context().is_none());
        assert!(runner.get_final_llm_resp().is_none());
    }

    #[test]
    fn test_step_before_reset() {
        let mut runner = ToolLoopAgentRunner::new();
        assert!(matches!(runner.step(), Err(AgentError::NotReset)));
    }

    #[test]
    fn test_transition_is_idempotent() {
        let mut state = AgentState::Running;
        transition(&mut state, AgentState::Running);
        assert_eq!(state, AgentState::Running);
        transition(&mut state, AgentState::Done);
        assert_eq!(state, AgentState::Done);
    }

    #[test]
    fn test_error_segment() {
        let msg = error_segment("c1", &AgentError::ToolNotFound("x".to_string()));
        assert_eq!(msg.content.text(), "error: Tool not found: x");
    }
}

//! Draining a runner on behalf of a chat platform

use crate::chain::{ChainKind, MessageChain};
use crate::errors::AgentError;
use crate::response::AgentResponseKind;
use crate::runner::ToolLoopAgentRunner;
use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Default step budget of a top-level turn
pub const DEFAULT_MAX_STEPS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAgentOptions {
    pub max_step: usize,
    /// Send the `Calling tool: ...` announcements to the user
    pub show_tool_use: bool,
    /// Deliver streamed turns as one ordinary result
    pub stream_to_general: bool,
    pub show_reasoning: bool,
}

impl Default for RunAgentOptions {
    fn default() -> Self {
        Self {
            max_step: DEFAULT_MAX_STEPS,
            show_tool_use: true,
            stream_to_general: false,
            show_reasoning: false,
        }
    }
}

/// Whether a final chain is the model's answer or some other result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultContentType {
    LlmResult,
    GeneralResult,
}

/// What the platform should do next
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// Streamed piece of the answer
    Delta(MessageChain),
    /// Section break in a streamed answer, before tool calls
    Break,
    /// A complete chain to present as the event result
    Final {
        content_type: ResultContentType,
        chain: MessageChain,
    },
    /// The run failed; the message is meant for the user
    Error(String),
}

/// Drive `runner` until it is done, the step budget runs out or the event is
/// stopped
pub fn run_agent(runner: &mut ToolLoopAgentRunner, options: RunAgentOptions) -> BoxStream<'_, RunOutput> {
    stream! {
        let Some(event) = runner.run_context().map(|rc| rc.event().clone()) else {
            yield RunOutput::Error(failure_message(&AgentError::NotReset));
            return;
        };
        let streaming = runner.streaming();

        for _ in 0..options.max_step {
            let mut responses = match runner.step() {
                Ok(responses) => responses,
                Err(e) => {
                    error!("agent step failed: {}", e);
                    yield RunOutput::Error(failure_message(&e));
                    return;
                }
            };

            while let Some(resp) = responses.next().await {
                if event.is_stopped() {
                    return;
                }
                match resp.kind {
                    AgentResponseKind::ToolCallResult => {
                        if resp.chain.kind == ChainKind::ToolDirectResult {
                            if let Err(e) = event.send(resp.chain).await {
                                error!("failed to send tool result: {}", e);
                            }
                        }
                    }
                    AgentResponseKind::ToolCall => {
                        if streaming {
                            yield RunOutput::Break;
                        }
                        if options.show_tool_use {
                            if let Err(e) = event.send(resp.chain).await {
                                warn!("failed to announce tool call: {}", e);
                            }
                        }
                    }
                    AgentResponseKind::StreamingDelta => {
                        if options.stream_to_general {
                            continue;
                        }
                        if resp.chain.kind == ChainKind::Reasoning && !options.show_reasoning {
                            continue;
                        }
                        yield RunOutput::Delta(resp.chain);
                    }
                    AgentResponseKind::LlmResult => {
                        if !streaming || options.stream_to_general {
                            yield RunOutput::Final {
                                content_type: ResultContentType::LlmResult,
                                chain: resp.chain,
                            };
                        }
                    }
                    AgentResponseKind::Err => {
                        yield RunOutput::Final {
                            content_type: ResultContentType::GeneralResult,
                            chain: resp.chain,
                        };
                    }
                }
            }
            drop(responses);

            if runner.done() {
                break;
            }
        }
    }
    .boxed()
}

fn failure_message(err: &AgentError) -> String {
    format!(
        "AstrBot request failed.\nError: {}\n\nCheck the console for details.\n",
        err
    )
}

//! Events emitted by the runner

use crate::chain::MessageChain;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Idle,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentResponseKind {
    StreamingDelta,
    LlmResult,
    ToolCall,
    ToolCallResult,
    Err,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    #[serde(rename = "type")]
    pub kind: AgentResponseKind,
    pub chain: MessageChain,
}

impl AgentResponse {
    pub fn new(kind: AgentResponseKind, chain: MessageChain) -> Self {
        Self { kind, chain }
    }

    pub(crate) fn text(kind: AgentResponseKind, text: impl Into<String>) -> Self {
        Self::new(kind, MessageChain::new().message(text))
    }
}

//! Runtime context for agent execution

use crate::chain::MessageChain;
use crate::errors::{AgentError, Result};
use crate::message::Message;
use crate::provider::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout of a single tool call
pub const DEFAULT_TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of nested handoffs allowed below the top-level agent
pub const DEFAULT_MAX_HANDOFF_DEPTH: usize = 4;

/// The chat-platform side of a conversation
///
/// The runtime only talks to the platform through this narrow contract:
/// sending a chain to the user, and a single pending-result slot that tools
/// can fill before asking for delivery.
#[async_trait]
pub trait EventContext: Send + Sync {
    /// Deliver a chain to the user now
    async fn send(&self, chain: MessageChain) -> Result<()>;

    fn get_result(&self) -> Option<MessageChain>;

    fn set_result(&self, chain: MessageChain);

    fn clear_result(&self);

    /// Stable identifier of the conversation this event belongs to
    fn unified_msg_origin(&self) -> String;

    /// Whether the pipeline asked to stop processing this event
    fn is_stopped(&self) -> bool {
        false
    }
}

/// Caller payload carried through a run
#[derive(Clone)]
pub struct AgentContext {
    pub provider: Arc<dyn Provider>,
    pub event: Arc<dyn EventContext>,
}

impl AgentContext {
    pub fn new(provider: Arc<dyn Provider>, event: Arc<dyn EventContext>) -> Self {
        Self { provider, event }
    }
}

/// One level of delegation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffFrame {
    pub agent_name: String,
    /// Steps the delegated agent may take
    pub step_budget: usize,
}

/// Explicit stack of active handoffs, outermost first
#[derive(Debug, Clone)]
pub struct HandoffStack {
    frames: Vec<HandoffFrame>,
    max_depth: usize,
}

impl HandoffStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn frames(&self) -> &[HandoffFrame] {
        &self.frames
    }

    /// Upper bound on steps spent by all active handoff levels together
    pub fn total_step_budget(&self) -> usize {
        self.frames.iter().map(|f| f.step_budget).sum()
    }

    /// Stack for a run delegated to `agent_name`, one level deeper
    pub fn enter(&self, agent_name: impl Into<String>, step_budget: usize) -> Result<HandoffStack> {
        if self.frames.len() >= self.max_depth {
            return Err(AgentError::HandoffDepthExceeded(self.max_depth));
        }
        let mut child = self.clone();
        child.frames.push(HandoffFrame {
            agent_name: agent_name.into(),
            step_budget,
        });
        Ok(child)
    }
}

impl Default for HandoffStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HANDOFF_DEPTH)
    }
}

/// Mutable state of one turn
///
/// The runner appends every completed tool round to `messages`; executors
/// only read from it.
#[derive(Clone)]
pub struct RunContext {
    pub context: AgentContext,
    pub messages: Vec<Message>,
    pub tool_call_timeout: Duration,
    pub handoff: HandoffStack,
}

impl RunContext {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            messages: Vec::new(),
            tool_call_timeout: DEFAULT_TOOL_CALL_TIMEOUT,
            handoff: HandoffStack::default(),
        }
    }

    pub fn with_tool_call_timeout(mut self, timeout: Duration) -> Self {
        self.tool_call_timeout = timeout;
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_max_handoff_depth(mut self, max_depth: usize) -> Self {
        self.handoff = HandoffStack::new(max_depth);
        self
    }

    pub fn event(&self) -> &Arc<dyn EventContext> {
        &self.context.event
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.context.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_stack_is_bounded() {
        let root = HandoffStack::new(2);
        let first = root.enter("planner", 15).unwrap();
        let second = first.enter("coder", 15).unwrap();

        assert_eq!(root.depth(), 0);
        assert_eq!(second.depth(), 2);
        assert_eq!(second.total_step_budget(), 30);
        assert_eq!(second.frames()[1].agent_name, "coder");
        assert!(matches!(
            second.enter("reviewer", 15),
            Err(AgentError::HandoffDepthExceeded(2))
        ));
    }
}

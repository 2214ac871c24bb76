//! Run configuration

use crate::context::{AgentContext, RunContext, DEFAULT_MAX_HANDOFF_DEPTH, DEFAULT_TOOL_CALL_TIMEOUT};
use crate::executor::{FunctionToolExecutor, DEFAULT_HANDOFF_MAX_STEPS};
use crate::manager::FunctionToolManager;
use crate::run::{RunAgentOptions, DEFAULT_MAX_STEPS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the tool-call timeout, in seconds
pub const TOOL_CALL_TIMEOUT_ENV: &str = "ASTRBOT_TOOL_CALL_TIMEOUT";

/// Configuration for agent runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of steps of the top-level agent
    pub max_steps: usize,

    /// Steps granted to each delegated agent
    pub handoff_max_steps: usize,

    /// How many handoffs may be nested
    pub max_handoff_depth: usize,

    /// Timeout of a single tool call, in seconds. Fractions are kept.
    pub tool_call_timeout_secs: f64,

    /// Request streamed completions
    pub streaming: bool,

    /// Tell the user which tools are being called
    pub show_tool_use: bool,

    /// Deliver streamed output as ordinary results
    pub stream_to_general: bool,

    pub show_reasoning: bool,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_handoff_max_steps(mut self, steps: usize) -> Self {
        self.handoff_max_steps = steps;
        self
    }

    pub fn with_max_handoff_depth(mut self, depth: usize) -> Self {
        self.max_handoff_depth = depth;
        self
    }

    pub fn with_tool_call_timeout(mut self, timeout: Duration) -> Self {
        self.tool_call_timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_show_tool_use(mut self, show: bool) -> Self {
        self.show_tool_use = show;
        self
    }

    /// Negative or non-finite values fall back to the default timeout
    pub fn tool_call_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.tool_call_timeout_secs).unwrap_or(DEFAULT_TOOL_CALL_TIMEOUT)
    }

    /// Fresh run context using these limits
    pub fn run_context(&self, context: AgentContext) -> RunContext {
        RunContext::new(context)
            .with_tool_call_timeout(self.tool_call_timeout())
            .with_max_handoff_depth(self.max_handoff_depth)
    }

    /// Executor resolving named tools through `registry`
    pub fn executor(&self, registry: Option<Arc<FunctionToolManager>>) -> FunctionToolExecutor {
        let executor = FunctionToolExecutor::new().with_handoff_max_steps(self.handoff_max_steps);
        match registry {
            Some(registry) => executor.with_registry(registry),
            None => executor,
        }
    }

    pub fn run_options(&self) -> RunAgentOptions {
        RunAgentOptions {
            max_step: self.max_steps,
            show_tool_use: self.show_tool_use,
            stream_to_general: self.stream_to_general,
            show_reasoning: self.show_reasoning,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            handoff_max_steps: DEFAULT_HANDOFF_MAX_STEPS,
            max_handoff_depth: DEFAULT_MAX_HANDOFF_DEPTH,
            tool_call_timeout_secs: std::env::var(TOOL_CALL_TIMEOUT_ENV)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TOOL_CALL_TIMEOUT.as_secs_f64()),
            streaming: false,
            show_tool_use: true,
            stream_to_general: false,
            show_reasoning: false,
        }
    }
}

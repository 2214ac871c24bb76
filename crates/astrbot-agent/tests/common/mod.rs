//! Scripted provider, recording event and stub MCP server shared by the
//! integration tests

#![allow(dead_code)]

use astrbot_agent::prelude::*;
use astrbot_agent::{AgentResponse, McpToolCaller, ToolExecutor};
use astrbot_mcp_core::McpResult;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned responses in order and records every request it sees
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<LLMResponse>>,
    streams: Mutex<VecDeque<Vec<LLMResponse>>>,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    pub fn streaming(streams: Vec<Vec<LLMResponse>>) -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(streams.into()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn text_chat(&self, request: &ProviderRequest) -> astrbot_agent::Result<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::ModelError("script exhausted".to_string()))
    }

    async fn text_chat_stream(
        &self,
        request: &ProviderRequest,
    ) -> astrbot_agent::Result<BoxStream<'static, astrbot_agent::Result<LLMResponse>>> {
        self.requests.lock().unwrap().push(request.clone());
        let chunks = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::ModelError("script exhausted".to_string()))?;
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

/// Chat event that remembers what was sent and what the result slot held
#[derive(Default)]
pub struct RecordingEvent {
    pub sent: Mutex<Vec<MessageChain>>,
    pub results_set: Mutex<Vec<MessageChain>>,
    result: Mutex<Option<MessageChain>>,
    stopped: AtomicBool,
}

impl RecordingEvent {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(MessageChain::plain_text).collect()
    }
}

#[async_trait]
impl EventContext for RecordingEvent {
    async fn send(&self, chain: MessageChain) -> astrbot_agent::Result<()> {
        self.sent.lock().unwrap().push(chain);
        Ok(())
    }

    fn get_result(&self) -> Option<MessageChain> {
        self.result.lock().unwrap().clone()
    }

    fn set_result(&self, chain: MessageChain) {
        self.results_set.lock().unwrap().push(chain.clone());
        *self.result.lock().unwrap() = Some(chain);
    }

    fn clear_result(&self) {
        *self.result.lock().unwrap() = None;
    }

    fn unified_msg_origin(&self) -> String {
        "test:private:42".to_string()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// MCP server stand-in answering every call with the same result
pub struct StubMcpServer {
    result: Option<ToolResult>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl StubMcpServer {
    pub fn new(result: Option<ToolResult>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl McpToolCaller for StubMcpServer {
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Option<ToolResult>> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        Ok(self.result.clone())
    }
}

pub fn object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

pub fn text_tool(name: &str, reply: &'static str) -> FunctionTool {
    FunctionTool::new(name, format!("{} tool", name), object_schema())
        .unwrap()
        .handler_fn(move |_inv| async move { Ok(Some(ToolOutput::text(reply))) })
}

pub fn tools(list: Vec<FunctionTool>) -> ToolSet {
    list.into_iter().collect()
}

/// Reset a fresh runner for `request`
pub fn runner_with(
    provider: Arc<ScriptedProvider>,
    event: Arc<RecordingEvent>,
    request: ProviderRequest,
    timeout: Duration,
    hooks: Arc<dyn AgentRunHooks>,
    streaming: bool,
) -> ToolLoopAgentRunner {
    let context = AgentContext::new(provider.clone(), event);
    let run_context = RunContext::new(context).with_tool_call_timeout(timeout);
    let executor: Arc<dyn ToolExecutor> = Arc::new(FunctionToolExecutor::new());
    let mut runner = ToolLoopAgentRunner::new();
    runner.reset(provider, request, run_context, executor, hooks, streaming);
    runner
}

pub fn simple_runner(
    provider: Arc<ScriptedProvider>,
    event: Arc<RecordingEvent>,
    request: ProviderRequest,
) -> ToolLoopAgentRunner {
    runner_with(
        provider,
        event,
        request,
        Duration::from_secs(60),
        Arc::new(NoopHooks),
        false,
    )
}

pub async fn drain_step(runner: &mut ToolLoopAgentRunner) -> Vec<AgentResponse> {
    runner.step().unwrap().collect().await
}

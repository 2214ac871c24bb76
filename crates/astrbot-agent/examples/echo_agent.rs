//! Echo agent example
//!
//! Runs one turn against a canned provider that calls an `echo` tool and then
//! answers. No API key or network access is needed.
//!
//! Run with:
//! ```bash
//! RUST_LOG=astrbot_agent=debug cargo run --example echo_agent
//! ```

use astrbot_agent::prelude::*;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Asks for the echo tool once, then repeats what it returned
#[derive(Default)]
struct CannedProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for CannedProvider {
    async fn text_chat(&self, request: &ProviderRequest) -> astrbot_agent::Result<LLMResponse> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(LLMResponse::assistant("").with_tool_call(
                "call_0",
                "echo",
                json!({"text": request.prompt}),
            ));
        }
        let echoed = request
            .tool_calls_result
            .last()
            .and_then(|r| r.tool_calls_result.first())
            .map(|m| m.content.text())
            .unwrap_or_default();
        Ok(LLMResponse::assistant(format!("The tool said: {}", echoed)))
    }
}

/// Prints everything sent to the "chat"
#[derive(Default)]
struct ConsoleEvent {
    result: Mutex<Option<MessageChain>>,
}

#[async_trait]
impl EventContext for ConsoleEvent {
    async fn send(&self, chain: MessageChain) -> astrbot_agent::Result<()> {
        println!("[send] {}", chain.plain_text());
        Ok(())
    }

    fn get_result(&self) -> Option<MessageChain> {
        self.result.lock().ok().and_then(|r| r.clone())
    }

    fn set_result(&self, chain: MessageChain) {
        if let Ok(mut slot) = self.result.lock() {
            *slot = Some(chain);
        }
    }

    fn clear_result(&self) {
        if let Ok(mut slot) = self.result.lock() {
            *slot = None;
        }
    }

    fn unified_msg_origin(&self) -> String {
        "console:private:0".to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let echo = FunctionTool::new(
        "echo",
        "Repeat the given text",
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to repeat"}
            },
            "required": ["text"]
        }),
    )?
    .handler_fn(|inv| async move {
        let text = inv.args["text"].as_str().unwrap_or_default().to_string();
        Ok(Some(ToolOutput::text(text)))
    });

    let mut tools = ToolSet::new();
    tools.add_tool(echo);

    let provider: Arc<dyn Provider> = Arc::new(CannedProvider::default());
    let event: Arc<dyn EventContext> = Arc::new(ConsoleEvent::default());
    let config = RunConfig::default();

    let mut runner = ToolLoopAgentRunner::new();
    runner.reset(
        provider.clone(),
        ProviderRequest::new("hello from the console").with_tools(tools),
        config.run_context(AgentContext::new(provider, event)),
        Arc::new(config.executor(None)),
        Arc::new(NoopHooks),
        config.streaming,
    );

    let mut outputs = run_agent(&mut runner, config.run_options());
    while let Some(output) = outputs.next().await {
        match output {
            RunOutput::Final { chain, .. } => println!("[final] {}", chain.plain_text()),
            RunOutput::Error(message) => eprintln!("{}", message),
            _ => {}
        }
    }

    Ok(())
}

//! Delegation to sub-agents
//!
//! A handoff tool named `transfer_to_<agent>` runs a nested agent turn and
//! folds the sub-agent's final answer into a single tool result.

use crate::agent::{Agent, ToolRef};
use crate::chain::MessageChain;
use crate::context::RunContext;
use crate::errors::Result;
use crate::executor::FunctionToolExecutor;
use crate::hooks::{AgentRunHooks, NoopHooks};
use crate::provider::ProviderRequest;
use crate::run::{run_agent, RunAgentOptions};
use crate::runner::ToolLoopAgentRunner;
use crate::tool::FunctionTool;
use crate::tool_set::ToolSet;
use astrbot_mcp_core::ToolResult;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const HANDOFF_NOTE: &str = "Note: If the result is error or need user provide more information, please provide more information to the agent (you can ask user for more information first).";

/// Wrap `agent` as a tool the model can call to delegate work
pub fn handoff_tool(agent: Agent, parameters: Option<Value>) -> Result<FunctionTool> {
    let name = agent.handoff_tool_name();
    let description = agent
        .instructions
        .clone()
        .unwrap_or_else(|| format!("Delegate tasks to {} agent to handle the request.", name));
    FunctionTool::handoff(
        name,
        description,
        parameters.unwrap_or_else(default_parameters),
        Arc::new(agent),
    )
}

fn default_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "input": {
                "type": "string",
                "description": "The input to be handed off to another agent. This should be a clear and concise request or task."
            }
        }
    })
}

async fn scoped_tool_set(executor: &FunctionToolExecutor, agent: &Agent) -> Option<ToolSet> {
    let refs = agent.tools.as_ref()?;
    let mut tools = ToolSet::new();
    for tool_ref in refs {
        match tool_ref {
            ToolRef::Tool(tool) => tools.add_tool(tool.clone()),
            ToolRef::Name(name) => {
                let resolved = match executor.registry() {
                    Some(registry) => registry.get_func(name).await,
                    None => None,
                };
                match resolved {
                    Some(tool) => tools.add_tool(tool),
                    None => warn!(agent = %agent.name, "handoff tool {} is not registered", name),
                }
            }
        }
    }
    Some(tools)
}

/// Run `agent` as a nested turn and report its final answer
pub(crate) async fn run_handoff(
    executor: &FunctionToolExecutor,
    agent: &Agent,
    tool: &FunctionTool,
    run_context: &RunContext,
    args: &Value,
) -> Result<ToolResult> {
    let input = args
        .get("input")
        .and_then(Value::as_str)
        .unwrap_or("agent")
        .to_string();
    let handoff = run_context
        .handoff
        .enter(agent.name.clone(), executor.handoff_max_steps())?;

    let request = ProviderRequest {
        prompt: input.clone(),
        system_prompt: tool.description.clone(),
        func_tool: scoped_tool_set(executor, agent).await,
        ..Default::default()
    };

    debug!(agent = %agent.name, depth = handoff.depth(), "delegating task, input: {}", input);
    let announcement = MessageChain::new().message(format!("Delegating task to agent: {}", agent.name));
    if let Err(e) = run_context.event().send(announcement).await {
        warn!("failed to announce handoff to {}: {}", agent.name, e);
    }

    let sub_context = RunContext {
        context: run_context.context.clone(),
        messages: Vec::new(),
        tool_call_timeout: run_context.tool_call_timeout,
        handoff,
    };
    let hooks: Arc<dyn AgentRunHooks> = agent
        .run_hooks
        .clone()
        .unwrap_or_else(|| Arc::new(NoopHooks));

    let mut runner = ToolLoopAgentRunner::new();
    runner.reset(
        run_context.provider().clone(),
        request,
        sub_context,
        Arc::new(executor.clone()),
        hooks,
        false,
    );

    let options = RunAgentOptions {
        max_step: executor.handoff_max_steps(),
        ..Default::default()
    };
    {
        let mut outputs = run_agent(&mut runner, options);
        while outputs.next().await.is_some() {}
    }

    match (runner.done(), runner.get_final_llm_resp()) {
        (true, Some(response)) => {
            debug!(agent = %agent.name, "delegated task finished: {}", response.completion_text);
            Ok(ToolResult::text(format!(
                "Agent {} respond with: {}\n\n{}",
                agent.name, response.completion_text, HANDOFF_NOTE
            )))
        }
        _ => Ok(ToolResult::text(format!(
            "error when delegating task to {}",
            agent.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolKind, ToolOrigin};

    #[test]
    fn test_handoff_tool_defaults() {
        let tool = Agent::builder("translator").build().into_handoff_tool().unwrap();

        assert_eq!(tool.name, "transfer_to_translator");
        assert_eq!(
            tool.description,
            "Delegate tasks to transfer_to_translator agent to handle the request."
        );
        assert_eq!(tool.parameters()["properties"]["input"]["type"], "string");
        assert_eq!(tool.origin(), ToolOrigin::Local);
        assert!(matches!(&tool.kind, ToolKind::Handoff(a) if a.name == "translator"));
    }

    #[test]
    fn test_handoff_tool_uses_instructions() {
        let agent = Agent::builder("coder").instructions("Writes code").build();
        let tool = handoff_tool(agent, Some(json!({"type": "object", "properties": {}}))).unwrap();
        assert_eq!(tool.description, "Writes code");
        assert!(tool.parameters()["properties"].as_object().unwrap().is_empty());
    }
}

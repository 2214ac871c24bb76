//! Tool system for agents
//!
//! A [`FunctionTool`] is a named capability with a JSON-schema parameter
//! contract. What happens when it is called depends on its [`ToolKind`]:
//! an in-process handler, a handoff to another agent, or a call forwarded to
//! a remote MCP server.

use crate::agent::Agent;
use crate::chain::MessageChain;
use crate::context::{AgentContext, RunContext};
use crate::errors::{AgentError, Result};
use astrbot_mcp_core::{McpToolCaller, McpToolInfo, ToolResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Where a tool comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOrigin {
    Local,
    Mcp,
}

/// One item yielded by a local tool handler
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// A result to hand back to the LLM
    Result(ToolResult),
    /// Deliver this chain to the user right away
    Send(MessageChain),
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        ToolOutput::Result(ToolResult::text(text))
    }
}

/// Arguments passed to a local handler
#[derive(Clone)]
pub struct ToolInvocation {
    pub context: AgentContext,
    pub args: Value,
}

pub type HandlerStream = BoxStream<'static, Result<ToolOutput>>;

pub type ToolHandler = Arc<dyn Fn(ToolInvocation) -> HandlerStream + Send + Sync>;

/// A tool object that implements its own call logic
#[async_trait]
pub trait RunnableTool: Send + Sync {
    async fn run(&self, run_context: &RunContext, args: Value) -> Result<Option<ToolOutput>>;
}

/// In-process implementation of a local tool
#[derive(Clone, Default)]
pub struct LocalTool {
    pub handler: Option<ToolHandler>,
    pub runnable: Option<Arc<dyn RunnableTool>>,
}

/// Tool living on a remote MCP server
#[derive(Clone)]
pub struct McpTool {
    pub server_name: String,
    /// Name of the tool on the server
    pub remote_name: String,
    pub client: Arc<dyn McpToolCaller>,
}

#[derive(Clone)]
pub enum ToolKind {
    Local(LocalTool),
    /// Delegates to another agent
    Handoff(Arc<Agent>),
    Mcp(McpTool),
}

#[derive(Clone)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    parameters: Value,
    /// Inactive tools stay registered but are not offered to the model
    pub active: bool,
    /// Plugin module that registered the handler, if any
    pub handler_module_path: Option<String>,
    pub kind: ToolKind,
}

impl FunctionTool {
    /// Create a local tool without an implementation yet
    ///
    /// Fails unless `parameters` is a JSON object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Result<Self> {
        let name = name.into();
        validate_parameters(&name, &parameters)?;
        Ok(Self {
            name,
            description: description.into(),
            parameters,
            active: true,
            handler_module_path: None,
            kind: ToolKind::Local(LocalTool::default()),
        })
    }

    /// Wrap a tool advertised by an MCP server
    pub fn mcp(info: &McpToolInfo, server_name: impl Into<String>, client: Arc<dyn McpToolCaller>) -> Result<Self> {
        let mut tool = Self::new(info.name.clone(), info.description.clone(), info.input_schema.clone())?;
        tool.kind = ToolKind::Mcp(McpTool {
            server_name: server_name.into(),
            remote_name: info.name.clone(),
            client,
        });
        Ok(tool)
    }

    /// Wrap an agent; the call runs a nested turn of that agent
    pub(crate) fn handoff(name: String, description: String, parameters: Value, agent: Arc<Agent>) -> Result<Self> {
        let mut tool = Self::new(name, description, parameters)?;
        tool.kind = ToolKind::Handoff(agent);
        Ok(tool)
    }

    /// Use a streaming handler that may yield several outputs
    pub fn with_handler(mut self, handler: ToolHandler) -> Self {
        match &mut self.kind {
            ToolKind::Local(local) => local.handler = Some(handler),
            _ => {
                self.kind = ToolKind::Local(LocalTool {
                    handler: Some(handler),
                    runnable: None,
                })
            }
        }
        self
    }

    /// Use a plain async function returning at most one output
    pub fn handler_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(ToolInvocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<ToolOutput>>> + Send + 'static,
    {
        self.with_handler(Arc::new(move |invocation: ToolInvocation| {
            stream::once(f(invocation))
                .filter_map(|res| async move { res.transpose() })
                .boxed()
        }))
    }

    /// Use a function returning a stream of outputs
    pub fn stream_handler<F, S>(self, f: F) -> Self
    where
        F: Fn(ToolInvocation) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<ToolOutput>> + Send + 'static,
    {
        self.with_handler(Arc::new(move |invocation: ToolInvocation| f(invocation).boxed()))
    }

    pub fn with_runnable(mut self, runnable: Arc<dyn RunnableTool>) -> Self {
        match &mut self.kind {
            ToolKind::Local(local) => local.runnable = Some(runnable),
            _ => {
                self.kind = ToolKind::Local(LocalTool {
                    handler: None,
                    runnable: Some(runnable),
                })
            }
        }
        self
    }

    pub fn with_module_path(mut self, path: impl Into<String>) -> Self {
        self.handler_module_path = Some(path.into());
        self
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn origin(&self) -> ToolOrigin {
        match self.kind {
            ToolKind::Local(_) | ToolKind::Handoff(_) => ToolOrigin::Local,
            ToolKind::Mcp(_) => ToolOrigin::Mcp,
        }
    }

    pub fn mcp_server_name(&self) -> Option<&str> {
        match &self.kind {
            ToolKind::Mcp(mcp) => Some(&mcp.server_name),
            _ => None,
        }
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ToolKind::Local(_) => "local",
            ToolKind::Handoff(_) => "handoff",
            ToolKind::Mcp(_) => "mcp",
        };
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("active", &self.active)
            .field("kind", &kind)
            .finish()
    }
}

fn validate_parameters(name: &str, parameters: &Value) -> Result<()> {
    let invalid = |reason: &str| {
        AgentError::Configuration(format!("invalid parameters schema for tool {}: {}", name, reason))
    };

    let schema = parameters
        .as_object()
        .ok_or_else(|| invalid("schema must be a JSON object"))?;

    if let Some(ty) = schema.get("type") {
        let well_formed = match ty {
            Value::String(_) => true,
            Value::Array(types) => types.iter().all(Value::is_string),
            _ => false,
        };
        if !well_formed {
            return Err(invalid("`type` must be a string or an array of strings"));
        }
    }
    if let Some(props) = schema.get("properties") {
        if !props.is_object() {
            return Err(invalid("`properties` must be an object"));
        }
    }
    if let Some(required) = schema.get("required") {
        if !required.as_array().is_some_and(|r| r.iter().all(Value::is_string)) {
            return Err(invalid("`required` must be an array of strings"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameters_must_be_object() {
        assert!(FunctionTool::new("ok", "", json!({"type": "object", "properties": {}})).is_ok());
        assert!(FunctionTool::new("bad", "", json!("string")).is_err());
        assert!(FunctionTool::new("bad", "", json!({"type": 3})).is_err());
        assert!(FunctionTool::new("bad", "", json!({"properties": []})).is_err());
        assert!(FunctionTool::new("bad", "", json!({"required": "x"})).is_err());
    }

    #[test]
    fn test_local_tool_origin() {
        let tool = FunctionTool::new("clock", "Current time", json!({"type": "object"}))
            .unwrap()
            .handler_fn(|_inv| async { Ok(Some(ToolOutput::text("12:00"))) })
            .with_module_path("plugins.clock");

        assert_eq!(tool.origin(), ToolOrigin::Local);
        assert!(tool.mcp_server_name().is_none());
        assert_eq!(tool.handler_module_path.as_deref(), Some("plugins.clock"));
        assert!(matches!(&tool.kind, ToolKind::Local(l) if l.handler.is_some()));
        assert!(format!("{:?}", tool).contains("clock"));
    }
}

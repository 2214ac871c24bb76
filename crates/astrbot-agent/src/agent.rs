//! Agent descriptors

use crate::errors::Result;
use crate::handoff;
use crate::hooks::AgentRunHooks;
use crate::tool::FunctionTool;
use std::sync::Arc;

/// A tool an agent may use, either registered elsewhere or owned directly
#[derive(Clone)]
pub enum ToolRef {
    /// Resolved through the tool registry when the agent runs
    Name(String),
    Tool(FunctionTool),
}

impl From<&str> for ToolRef {
    fn from(name: &str) -> Self {
        ToolRef::Name(name.to_string())
    }
}

impl From<String> for ToolRef {
    fn from(name: String) -> Self {
        ToolRef::Name(name)
    }
}

impl From<FunctionTool> for ToolRef {
    fn from(tool: FunctionTool) -> Self {
        ToolRef::Tool(tool)
    }
}

/// An agent: a name, optional instructions, the tools it may use and its
/// hooks. Immutable once built.
#[derive(Clone)]
pub struct Agent {
    /// The name of the agent
    pub name: String,

    /// Instructions (system prompt) for the agent
    pub instructions: Option<String>,

    /// Tools available to the agent; `None` means no tools at all
    pub tools: Option<Vec<ToolRef>>,

    pub run_hooks: Option<Arc<dyn AgentRunHooks>>,
}

impl Agent {
    /// Create a builder for the agent
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// Name of the tool that hands off to this agent
    pub fn handoff_tool_name(&self) -> String {
        format!("transfer_to_{}", self.name)
    }

    /// Wrap this agent as a handoff tool with the default input schema
    pub fn into_handoff_tool(self) -> Result<FunctionTool> {
        handoff::handoff_tool(self, None)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("tools", &self.tools.as_ref().map(Vec::len))
            .field("run_hooks", &self.run_hooks.is_some())
            .finish()
    }
}

/// Builder for creating agents
pub struct AgentBuilder {
    name: String,
    instructions: Option<String>,
    tools: Option<Vec<ToolRef>>,
    run_hooks: Option<Arc<dyn AgentRunHooks>>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            tools: None,
            run_hooks: None,
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Add a tool by name or by value
    pub fn tool(mut self, tool: impl Into<ToolRef>) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool.into());
        self
    }

    pub fn tools<I, T>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ToolRef>,
    {
        self.tools
            .get_or_insert_with(Vec::new)
            .extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn AgentRunHooks>) -> Self {
        self.run_hooks = Some(hooks);
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            name: self.name,
            instructions: self.instructions,
            tools: self.tools,
            run_hooks: self.run_hooks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_builder() {
        let local = FunctionTool::new("clock", "Current time", json!({"type": "object"})).unwrap();
        let agent = Agent::builder("researcher")
            .instructions("Find sources")
            .tool("web_search")
            .tool(local)
            .build();

        assert_eq!(agent.name, "researcher");
        assert_eq!(agent.handoff_tool_name(), "transfer_to_researcher");
        let tools = agent.tools.as_ref().unwrap();
        assert!(matches!(&tools[0], ToolRef::Name(n) if n == "web_search"));
        assert!(matches!(&tools[1], ToolRef::Tool(t) if t.name == "clock"));
    }

    #[test]
    fn test_agent_without_tools() {
        let agent = Agent::builder("chat").build();
        assert!(agent.tools.is_none());
        assert!(agent.instructions.is_none());
    }
}

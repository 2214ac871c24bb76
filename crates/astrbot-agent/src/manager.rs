//! Registry of every tool known to the bot
//!
//! [`FunctionToolManager`] owns the full [`ToolSet`] (plugin tools and the
//! tools discovered on MCP servers) together with one [`McpClient`] per
//! enabled server. Server definitions live in `<data_dir>/mcp_server.json`:
//!
//! ```json
//! {
//!     "mcpServers": {
//!         "fetch": { "command": "uvx", "args": ["mcp-server-fetch"] },
//!         "search": { "url": "http://localhost:8000/sse", "active": false }
//!     }
//! }
//! ```

use crate::errors::{AgentError, Result};
use crate::tool::{FunctionTool, ToolHandler};
use crate::tool_set::ToolSet;
use astrbot_mcp_client::McpClient;
use astrbot_mcp_core::{is_active, McpError, McpServerConfig, McpServersFile, McpToolCaller};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// How long enabling one MCP server may take
pub const DEFAULT_ENABLE_TIMEOUT: Duration = Duration::from_secs(30);

pub const MCP_CONFIG_FILE: &str = "mcp_server.json";

/// One parameter of a plugin tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncArg {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl FuncArg {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

pub struct FunctionToolManager {
    data_dir: PathBuf,
    tools: RwLock<ToolSet>,
    mcp_clients: RwLock<HashMap<String, Arc<McpClient>>>,
}

impl FunctionToolManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tools: RwLock::new(ToolSet::new()),
            mcp_clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn mcp_config_path(&self) -> PathBuf {
        self.data_dir.join(MCP_CONFIG_FILE)
    }

    /// Register a tool, replacing any tool of the same name
    pub async fn add_tool(&self, tool: FunctionTool) {
        self.tools.write().await.add_tool(tool);
    }

    /// Register a plugin tool from a flat argument list
    ///
    /// Every argument becomes a property of an object schema.
    pub async fn add_func(
        &self,
        name: &str,
        func_args: &[FuncArg],
        desc: &str,
        handler: ToolHandler,
    ) -> Result<()> {
        let properties: Map<String, Value> = func_args
            .iter()
            .map(|arg| {
                (
                    arg.name.clone(),
                    json!({"type": arg.kind, "description": arg.description}),
                )
            })
            .collect();
        let parameters = json!({"type": "object", "properties": properties});
        let tool = FunctionTool::new(name, desc, parameters)?.with_handler(handler);

        let mut tools = self.tools.write().await;
        tools.remove_tool(name);
        tools.add_tool(tool);
        info!("added function tool: {}", name);
        Ok(())
    }

    pub async fn remove_func(&self, name: &str) -> Option<FunctionTool> {
        self.tools.write().await.remove_tool(name)
    }

    pub async fn get_func(&self, name: &str) -> Option<FunctionTool> {
        self.tools.read().await.get_tool(name).cloned()
    }

    /// Snapshot of every registered tool, active or not
    pub async fn get_full_tool_set(&self) -> ToolSet {
        self.tools.read().await.clone()
    }

    /// OpenAI-style declarations of the active tools
    pub async fn get_func_desc_openai_style(&self, omit_empty_parameter_field: bool) -> Vec<Value> {
        self.tools
            .read()
            .await
            .active_only()
            .openai_schema(omit_empty_parameter_field)
    }

    pub async fn get_func_desc_anthropic_style(&self) -> Vec<Value> {
        self.tools.read().await.active_only().anthropic_schema()
    }

    pub async fn get_func_desc_google_genai_style(&self) -> Value {
        self.tools.read().await.active_only().google_schema()
    }

    /// Hide a tool from the model; `false` if no such tool exists
    pub async fn deactivate_llm_tool(&self, name: &str) -> bool {
        match self.tools.write().await.get_tool_mut(name) {
            Some(tool) => {
                tool.active = false;
                true
            }
            None => false,
        }
    }

    /// Expose a tool to the model again
    ///
    /// Fails when the plugin owning the tool is listed in `disabled_plugins`.
    pub async fn activate_llm_tool(&self, name: &str, disabled_plugins: &HashSet<String>) -> Result<bool> {
        let mut tools = self.tools.write().await;
        let Some(tool) = tools.get_tool_mut(name) else {
            return Ok(false);
        };
        if let Some(module) = &tool.handler_module_path {
            if disabled_plugins.contains(module) {
                return Err(AgentError::Configuration(format!(
                    "the plugin {} owning tool {} is disabled, enable it before activating the tool",
                    module, name
                )));
            }
        }
        tool.active = true;
        Ok(true)
    }

    /// Connect every active server listed in `mcp_server.json`
    ///
    /// Creates an empty config file on first start. A server that fails to
    /// come up is logged and skipped.
    pub async fn init_mcp_clients(&self) -> Result<()> {
        let path = self.mcp_config_path();
        if !tokio::fs::try_exists(&path).await? {
            self.save_mcp_config(&McpServersFile::default()).await?;
            info!("created empty MCP server config at {}", path.display());
            return Ok(());
        }

        let config = self.load_mcp_config().await;
        let pending = config
            .mcp_servers
            .iter()
            .filter(|(_, server)| is_active(server))
            .map(|(name, server)| async move {
                let res = self.enable_mcp_server(name, server, DEFAULT_ENABLE_TIMEOUT).await;
                (name, res)
            });

        for (name, res) in join_all(pending).await {
            if let Err(e) = res {
                error!(server = %name, "failed to initialize MCP server: {}", e);
            }
        }
        Ok(())
    }

    /// Connect to a server and register its tools
    ///
    /// Does nothing if a server of that name is already enabled. Tools the
    /// server registered before are replaced.
    pub async fn enable_mcp_server(&self, name: &str, config: &Value, timeout: Duration) -> Result<()> {
        if self.mcp_clients.read().await.contains_key(name) {
            debug!(server = %name, "MCP server already enabled");
            return Ok(());
        }

        let server_config = McpServerConfig::from_value(config)?;
        let client = Arc::new(McpClient::new(name));
        let connect = async {
            client.connect(&server_config).await?;
            client.list_tools_and_save().await
        };
        let remote_tools = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(tools)) => tools,
            Ok(Err(e)) => {
                log_errlogs(name, &client).await;
                client.cleanup().await;
                return Err(e.into());
            }
            Err(_) => {
                log_errlogs(name, &client).await;
                client.cleanup().await;
                return Err(McpError::Timeout(timeout.as_secs()).into());
            }
        };

        let caller: Arc<dyn McpToolCaller> = client.clone();
        let mut registered = Vec::with_capacity(remote_tools.len());
        for info in &remote_tools {
            match FunctionTool::mcp(info, name, caller.clone()) {
                Ok(tool) => registered.push(tool),
                Err(e) => warn!(server = %name, "skipping MCP tool {}: {}", info.name, e),
            }
        }
        let names: Vec<String> = registered.iter().map(|t| t.name.clone()).collect();

        {
            let mut tools = self.tools.write().await;
            tools.retain(|t| t.mcp_server_name() != Some(name));
            for tool in registered {
                tools.add_tool(tool);
            }
        }
        self.mcp_clients.write().await.insert(name.to_string(), client);

        info!(server = %name, "connected to MCP server, tools: {:?}", names);
        Ok(())
    }

    /// Disconnect a server and drop its tools; `false` if it was not enabled
    pub async fn disable_mcp_server(&self, name: &str) -> bool {
        let Some(client) = self.mcp_clients.write().await.remove(name) else {
            return false;
        };
        client.cleanup().await;
        self.tools
            .write()
            .await
            .retain(|t| t.mcp_server_name() != Some(name));
        info!(server = %name, "closed MCP server");
        true
    }

    /// Connect to a server only long enough to list its tool names
    pub async fn test_mcp_server_connection(config: &Value) -> Result<Vec<String>> {
        let server_config = McpServerConfig::from_value(config)?;
        let client = McpClient::new("test");
        debug!("testing MCP server connection");
        let listed = async {
            client.connect(&server_config).await?;
            client.list_tools_and_save().await
        }
        .await;
        client.cleanup().await;
        Ok(listed?.into_iter().map(|t| t.name).collect())
    }

    pub async fn mcp_client(&self, name: &str) -> Option<Arc<McpClient>> {
        self.mcp_clients.read().await.get(name).cloned()
    }

    pub async fn mcp_server_names(&self) -> Vec<String> {
        self.mcp_clients.read().await.keys().cloned().collect()
    }

    /// Read `mcp_server.json`, creating it when missing
    ///
    /// An unreadable file is logged and treated as empty.
    pub async fn load_mcp_config(&self) -> McpServersFile {
        let path = self.mcp_config_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    error!("failed to parse MCP config {}: {}", path.display(), e);
                    McpServersFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = McpServersFile::default();
                if let Err(e) = self.save_mcp_config(&config).await {
                    error!("failed to create MCP config {}: {}", path.display(), e);
                }
                config
            }
            Err(e) => {
                error!("failed to read MCP config {}: {}", path.display(), e);
                McpServersFile::default()
            }
        }
    }

    pub async fn save_mcp_config(&self, config: &McpServersFile) -> Result<()> {
        let path = self.mcp_config_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&path, body).await?;
        Ok(())
    }

    /// Disable every MCP server
    pub async fn shutdown(&self) {
        for name in self.mcp_server_names().await {
            self.disable_mcp_server(&name).await;
        }
    }
}

impl std::fmt::Debug for FunctionToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionToolManager")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

async fn log_errlogs(name: &str, client: &McpClient) {
    let errlogs = client.server_errlogs().await;
    if !errlogs.is_empty() {
        warn!(server = %name, "server output before failure:\n{}", errlogs.join("\n"));
    }
}

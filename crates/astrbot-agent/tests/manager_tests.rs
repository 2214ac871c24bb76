//! Integration tests for the tool registry and `mcp_server.json` handling

use astrbot_agent::{FunctionTool, FunctionToolManager, ToolOrigin};
use astrbot_mcp_core::McpServersFile;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_default_config() {
    let dir = TempDir::new().unwrap();
    let manager = FunctionToolManager::new(dir.path());

    manager.init_mcp_clients().await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("mcp_server.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, json!({"mcpServers": {}}));
    assert!(manager.mcp_server_names().await.is_empty());
}

#[tokio::test]
async fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let manager = FunctionToolManager::new(dir.path().join("nested"));

    let mut config = McpServersFile::default();
    config.mcp_servers.insert(
        "fetch".to_string(),
        json!({"command": "uvx", "args": ["mcp-server-fetch"], "active": false}),
    );
    manager.save_mcp_config(&config).await.unwrap();

    let loaded = manager.load_mcp_config().await;
    assert_eq!(loaded.mcp_servers.len(), 1);
    assert_eq!(loaded.mcp_servers["fetch"]["command"], "uvx");
}

#[tokio::test]
async fn test_load_missing_config_creates_it() {
    let dir = TempDir::new().unwrap();
    let manager = FunctionToolManager::new(dir.path());

    let loaded = manager.load_mcp_config().await;
    assert!(loaded.mcp_servers.is_empty());
    assert!(manager.mcp_config_path().exists());
}

#[tokio::test]
async fn test_load_corrupt_config_falls_back() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("mcp_server.json"), "{not json").unwrap();
    let manager = FunctionToolManager::new(dir.path());

    let loaded = manager.load_mcp_config().await;
    assert!(loaded.mcp_servers.is_empty());
}

#[tokio::test]
async fn test_init_skips_inactive_and_broken_servers() {
    let dir = TempDir::new().unwrap();
    let config = json!({
        "mcpServers": {
            "disabled": {"command": "uvx", "args": ["mcp-server-fetch"], "active": false},
            "broken": {"command": "astrbot-test-no-such-binary"}
        }
    });
    std::fs::write(
        dir.path().join("mcp_server.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();
    let manager = FunctionToolManager::new(dir.path());
    manager
        .add_tool(FunctionTool::new("local", "Local tool", json!({"type": "object"})).unwrap())
        .await;

    manager.init_mcp_clients().await.unwrap();

    assert!(manager.mcp_server_names().await.is_empty());
    let tools = manager.get_full_tool_set().await;
    assert_eq!(tools.names(), vec!["local"]);
    assert!(tools.iter().all(|t| t.origin() == ToolOrigin::Local));
}

#[tokio::test]
async fn test_enable_unreachable_url_server_fails() {
    let manager = FunctionToolManager::new(std::env::temp_dir());
    let config = json!({"url": "http://127.0.0.1:9/sse", "timeout": 1});

    let res = manager
        .enable_mcp_server("offline", &config, Duration::from_secs(5))
        .await;
    assert!(res.is_err());
    assert!(manager.mcp_client("offline").await.is_none());
    assert!(!manager.disable_mcp_server("offline").await);
}

#[tokio::test]
async fn test_connection_test_rejects_bad_config() {
    let res = FunctionToolManager::test_mcp_server_connection(&json!("not an object")).await;
    assert!(res.is_err());
}

//! Tool and result types shared between the MCP client and the agent runtime

use serde::{Deserialize, Serialize};

/// A tool advertised by a remote MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    /// Name of the tool on the remote server
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for input parameters
    #[serde(default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Result of tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool
    pub content: Vec<ContentBlock>,
    /// Whether the tool execution errored
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Create a result with image content
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Image {
                data: data.into(),
                mime_type: mime_type.into(),
            }],
            is_error: false,
        }
    }

    /// Concatenated text of every text block
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content block in MCP responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },
    /// Image content (base64 encoded)
    Image { data: String, mime_type: String },
    /// Audio content (base64 encoded)
    Audio { data: String, mime_type: String },
    /// Embedded resource
    Resource { resource: ResourceContents },
    /// Link to a resource the client may fetch itself
    ResourceLink { uri: String },
}

impl ContentBlock {
    /// Get text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Body of an embedded resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceContents {
    Text {
        uri: String,
        #[serde(default)]
        mime_type: Option<String>,
        text: String,
    },
    Blob {
        uri: String,
        #[serde(default)]
        mime_type: Option<String>,
        /// Base64-encoded payload
        blob: String,
    },
}

impl ResourceContents {
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            ResourceContents::Text { mime_type, .. } | ResourceContents::Blob { mime_type, .. } => {
                mime_type.as_deref()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_result() {
        let result = ToolResult::text("hello");
        assert!(!result.is_error);
        assert_eq!(result.content[0].as_text(), Some("hello"));
        assert_eq!(ToolResult::error("boom").joined_text(), "boom");
    }

    #[test]
    fn test_content_block_wire_shape() {
        let block: ContentBlock = serde_json::from_value(json!({
            "type": "resource",
            "resource": {"uri": "file:///a.png", "mime_type": "image/png", "blob": "AAAA"}
        }))
        .unwrap();

        match block {
            ContentBlock::Resource { resource } => {
                assert!(matches!(resource, ResourceContents::Blob { .. }));
                assert_eq!(resource.mime_type(), Some("image/png"));
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_tool_info_defaults_schema() {
        let info: McpToolInfo = serde_json::from_value(json!({"name": "fetch"})).unwrap();
        assert_eq!(info.input_schema["type"], "object");
        assert!(info.description.is_empty());
    }
}

//! Platform-neutral message chains
//!
//! A [`MessageChain`] is what the runtime hands to the chat platform: an
//! ordered list of components plus a [`ChainKind`] telling the platform
//! bridge how to treat it.

use serde::{Deserialize, Serialize};

/// How a chain should be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    #[default]
    Normal,
    /// Tool output that goes straight to the user instead of back to the LLM
    ToolDirectResult,
    /// Marks a section break in a streamed reply
    Break,
    /// Model reasoning, shown only when configured
    Reasoning,
}

/// One piece of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Plain { text: String },
    /// Base64-encoded image bytes
    Base64Image { data: String },
    ImageUrl { url: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageChain {
    pub components: Vec<Component>,
    #[serde(default)]
    pub kind: ChainKind,
}

impl MessageChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(kind: ChainKind) -> Self {
        Self {
            components: Vec::new(),
            kind,
        }
    }

    /// Append plain text
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.components.push(Component::Plain { text: text.into() });
        self
    }

    /// Append a base64-encoded image
    pub fn base64_image(mut self, data: impl Into<String>) -> Self {
        self.components
            .push(Component::Base64Image { data: data.into() });
        self
    }

    pub fn url_image(mut self, url: impl Into<String>) -> Self {
        self.components.push(Component::ImageUrl { url: url.into() });
        self
    }

    /// Same components, different routing
    pub fn into_kind(mut self, kind: ChainKind) -> Self {
        self.kind = kind;
        self
    }

    /// Concatenated text of all plain components
    pub fn plain_text(&self) -> String {
        self.components
            .iter()
            .filter_map(|c| match c {
                Component::Plain { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

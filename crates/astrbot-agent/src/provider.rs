//! Boundary to LLM provider clients
//!
//! Concrete providers (OpenAI, Anthropic, Gemini, ...) live outside this
//! crate. They receive a [`ProviderRequest`] and answer with an
//! [`LLMResponse`]; provider-level failures may be returned either as `Err`
//! or as a response with [`LlmRole::Err`], the runner treats both the same.

use crate::chain::MessageChain;
use crate::errors::Result;
use crate::message::{Message, ToolCall, ToolCallsResult};
use crate::tool_set::ToolSet;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a provider needs for one completion
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub prompt: String,
    pub session_id: Option<String>,
    pub image_urls: Vec<String>,
    /// Tools offered to the model, if any
    pub func_tool: Option<ToolSet>,
    /// Prior conversation
    pub contexts: Vec<Message>,
    pub system_prompt: String,
    /// Tool rounds completed so far in this turn
    pub tool_calls_result: Vec<ToolCallsResult>,
    pub model: Option<String>,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.func_tool = Some(tools);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn append_tool_calls_result(&mut self, result: ToolCallsResult) {
        self.tool_calls_result.push(result);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    #[default]
    Assistant,
    Err,
}

/// A completion, a streamed chunk of one, or a provider error
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    pub role: LlmRole,
    pub completion_text: String,
    /// Rendered reply, preferred over `completion_text` when present
    pub result_chain: Option<MessageChain>,
    pub tools_call_name: Vec<String>,
    pub tools_call_args: Vec<Value>,
    pub tools_call_ids: Vec<String>,
    /// True for intermediate streaming chunks
    pub is_chunk: bool,
}

impl LLMResponse {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            completion_text: text.into(),
            ..Default::default()
        }
    }

    pub fn err(text: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Err,
            completion_text: text.into(),
            ..Default::default()
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            completion_text: text.into(),
            is_chunk: true,
            ..Default::default()
        }
    }

    /// Append one tool-call intent
    pub fn with_tool_call(mut self, id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        self.tools_call_ids.push(id.into());
        self.tools_call_name.push(name.into());
        self.tools_call_args.push(args);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tools_call_name.is_empty()
    }

    /// Tool-call intents in a re-submittable form
    pub fn to_openai_tool_calls(&self) -> Vec<ToolCall> {
        self.tools_call_name
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let arguments = self
                    .tools_call_args
                    .get(i)
                    .map(|args| args.to_string());
                let id = self.tools_call_ids.get(i).cloned().unwrap_or_default();
                ToolCall::function(id, name.clone(), arguments)
            })
            .collect()
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// One blocking completion
    async fn text_chat(&self, request: &ProviderRequest) -> Result<LLMResponse>;

    /// Streamed completion: chunks with `is_chunk` set, then one final
    /// response. The default yields the blocking completion as the only item.
    async fn text_chat_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<LLMResponse>>> {
        let response = self.text_chat(request).await?;
        Ok(stream::once(async move { Ok(response) }).boxed())
    }
}

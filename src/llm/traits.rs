//! Model client trait and request/response shapes
//!
//! The agent loop only sees `ChatModel`; the HTTP client is one implementation.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolCall, ToolDefinition, Usage};
use crate::llm::models::ModelFamily;

/// Options for a completion call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// How the model may use the offered tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// Tool use is forbidden
    None,
}

impl ToolChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolChoice::None => "none",
        }
    }
}

/// A fully resolved completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Temperature after the model-family rule was applied
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Offered tools; `None` for finalization
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    /// Request that offers tools to the model
    pub fn with_tools(
        model: impl Into<String>,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: GenerateOptions,
        default_temperature: f32,
    ) -> Self {
        let model = model.into();
        let requested = options.temperature.unwrap_or(default_temperature);
        let temperature = ModelFamily::of(&model).temperature(requested);
        Self {
            model,
            messages,
            temperature,
            max_tokens: options.max_tokens,
            tools: Some(tools),
            tool_choice: None,
        }
    }

    /// The same request with tool use disabled and the schema removed
    pub fn finalization(&self) -> Self {
        Self {
            tools: None,
            tool_choice: Some(ToolChoice::None),
            ..self.clone()
        }
    }

    pub fn family(&self) -> ModelFamily {
        ModelFamily::of(&self.model)
    }

    pub fn offers_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Parsed response from a completion call
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content, absent when the model only requested tools
    pub content: Option<String>,
    /// Tool calls the model wants to make
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
    /// Model that generated the response
    pub model: String,
}

impl CompletionResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait for chat-completion backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one completion request and return the first choice
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name
    fn name(&self) -> &str;
}

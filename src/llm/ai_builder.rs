//! AI Builder client implementation
//!
//! Async HTTP client for the OpenAI-compatible chat completion endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{Config, FerretError, Message, Result, Role, ToolCall, ToolDefinition, Usage};
use crate::llm::models::ModelFamily;
use crate::llm::traits::{ChatModel, CompletionRequest, CompletionResponse};

/// Chat completion client
#[derive(Clone)]
pub struct AiBuilderClient {
    client: Client,
    chat_url: String,
    token: Option<String>,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

/// Message in the upstream format
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

/// Tool call in the upstream format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl AiBuilderClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.chat_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            chat_url: config.chat_url(),
            token: config.api.token.clone(),
        })
    }

    /// Convert internal Message to the upstream format
    fn to_wire_message(msg: &Message) -> WireMessage<'_> {
        WireMessage {
            role: msg.role,
            content: msg.content.as_deref(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        call_type: function_type(),
                        function: WireFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.as_deref(),
        }
    }

    /// Build the request body, choosing the token-limit field by family
    fn to_wire_request(request: &CompletionRequest) -> ChatRequest<'_> {
        let (max_tokens, max_completion_tokens) = match request.family() {
            ModelFamily::Reasoning => (None, request.max_tokens),
            ModelFamily::General => (request.max_tokens, None),
        };

        ChatRequest {
            model: &request.model,
            messages: request.messages.iter().map(Self::to_wire_message).collect(),
            temperature: request.temperature,
            tools: request.tools.as_deref(),
            tool_choice: request.tool_choice.map(|c| c.as_str()),
            max_tokens,
            max_completion_tokens,
        }
    }

    /// Convert the upstream response, requiring at least one choice
    fn to_completion_response(response: ChatResponse, model: &str) -> Result<CompletionResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            FerretError::protocol("model endpoint returned a response without choices")
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(CompletionResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
            usage: response.usage,
            model: response.model.unwrap_or_else(|| model.to_string()),
        })
    }
}

#[async_trait]
impl ChatModel for AiBuilderClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let token = self.token.as_deref().ok_or_else(|| {
            FerretError::config(
                "AI_BUILDER_TOKEN is not configured; set it in the environment or a .env file",
            )
        })?;

        let body = Self::to_wire_request(request);
        tracing::debug!(
            model = %request.model,
            messages = body.messages.len(),
            tools = request.offers_tools(),
            tool_choice = ?body.tool_choice,
            token_field = request.family().token_limit_field(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FerretError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let response_text = response.text().await?;
        let chat_response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            FerretError::protocol(format!("failed to parse model response: {}", e))
        })?;

        Self::to_completion_response(chat_response, &request.model)
    }

    fn name(&self) -> &str {
        "ai-builder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::traits::GenerateOptions;

    fn request(model: &str, max_tokens: Option<u32>) -> CompletionRequest {
        CompletionRequest::with_tools(
            model,
            vec![
                Message::user("hi"),
                Message::assistant_tool_calls(vec![ToolCall::new(
                    "call_1",
                    "search",
                    r#"{"keyword":"rust"}"#,
                )]),
                Message::tool(crate::core::ToolResult::success("call_1", "results")),
            ],
            vec![ToolDefinition::function(
                "search",
                "search",
                serde_json::json!({"type": "object"}),
            )],
            GenerateOptions {
                temperature: None,
                max_tokens,
            },
            0.7,
        )
    }

    #[test]
    fn test_reasoning_model_uses_completion_token_cap() {
        let req = request("gpt-5", Some(100));
        let body = serde_json::to_value(AiBuilderClient::to_wire_request(&req)).unwrap();
        assert_eq!(body["max_completion_tokens"], 100);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["temperature"], 1.0);
    }

    #[test]
    fn test_general_model_uses_max_tokens() {
        let req = request("deepseek", Some(100));
        let body = serde_json::to_value(AiBuilderClient::to_wire_request(&req)).unwrap();
        assert_eq!(body["max_tokens"], 100);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_wire_messages() {
        let req = request("deepseek", None);
        let body = serde_json::to_value(AiBuilderClient::to_wire_request(&req)).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages[1]["role"], "assistant");
        assert!(messages[1]["content"].is_null());
        assert_eq!(messages[1]["tool_calls"][0]["type"], "function");
        assert_eq!(messages[1]["tool_calls"][0]["function"]["name"], "search");
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["function"]["name"], "search");
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_finalization_body() {
        let req = request("deepseek", None).finalization();
        let body = serde_json::to_value(AiBuilderClient::to_wire_request(&req)).unwrap();
        assert_eq!(body["tool_choice"], "none");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_empty_choices_is_protocol_violation() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = AiBuilderClient::to_completion_response(response, "gpt-5").unwrap_err();
        assert!(matches!(err, FerretError::ProtocolViolation(_)));
    }

    #[test]
    fn test_response_conversion() {
        let response: ChatResponse = serde_json::from_str(
            r#"{
                "model": "gpt-5-2025",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_9",
                            "type": "function",
                            "function": {"name": "search", "arguments": "{\"keyword\":\"x\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
            }"#,
        )
        .unwrap();

        let converted = AiBuilderClient::to_completion_response(response, "gpt-5").unwrap();
        assert_eq!(converted.model, "gpt-5-2025");
        assert_eq!(converted.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(converted.tool_calls[0].id, "call_9");
        assert_eq!(converted.tool_calls[0].arguments, r#"{"keyword":"x"}"#);
        assert_eq!(converted.usage.unwrap().total_tokens, 7);
    }
}

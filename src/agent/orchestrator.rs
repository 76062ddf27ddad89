//! Agent orchestrator
//!
//! The agentic loop controller. Alternates model calls with concurrent tool
//! rounds until the model answers on its own or the round bound forces a
//! final, tool-free answer.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::conversation::validate_history;
use crate::agent::events::{AgentEvent, AgentEventStream, EventSink};
use crate::agent::loop_state::{AgentResponse, LoopState, Transition};
use crate::core::{Config, FerretError, Message, Result, Role};
use crate::llm::{AiBuilderClient, ChatModel, CompletionRequest, GenerateOptions};
use crate::tools::{ToolDispatcher, ToolRegistry};

/// Events buffered between the loop task and a slow consumer
const EVENT_BUFFER: usize = 64;

/// A single-message request in blocking mode
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    /// Model override; the configured default when absent
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Agentic loop controller
///
/// Cheap to clone; every request owns its own [`LoopState`], so clones can
/// serve concurrent requests.
#[derive(Clone)]
pub struct Agent {
    config: Arc<Config>,
    model: Arc<dyn ChatModel>,
    dispatcher: ToolDispatcher,
}

impl Agent {
    /// Create an agent talking to the configured endpoints
    pub fn from_config(config: Config) -> Result<Self> {
        let model = AiBuilderClient::from_config(&config)?;
        let registry = ToolRegistry::with_search(&config)?;
        Ok(Self::with_parts(config, Arc::new(model), Arc::new(registry)))
    }

    /// Create an agent from explicit components
    pub fn with_parts(
        config: Config,
        model: Arc<dyn ChatModel>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            model,
            dispatcher: ToolDispatcher::new(registry),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the configured default model
    pub fn default_model(&self) -> &str {
        &self.config.models.default
    }

    /// Answer one message, running the whole loop before returning
    pub async fn run_blocking(&self, request: ChatRequest) -> Result<AgentResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.models.default.clone());
        let history = vec![Message::user(request.message.clone())];

        self.run(history, &model, request.options(), &EventSink::disabled())
            .await
    }

    /// Answer the last user message of `history`, streaming progress events
    ///
    /// The history is validated before anything runs. The returned stream
    /// yields `log` events followed by exactly one `complete` or `error`.
    /// Dropping it aborts the run, including in-flight tool calls. Must be
    /// called inside a tokio runtime.
    pub fn run_streaming(
        &self,
        history: Vec<Message>,
        model: impl Into<String>,
    ) -> Result<AgentEventStream> {
        validate_history(&history)?;

        let (sink, rx) = EventSink::channel(EVENT_BUFFER);
        let agent = self.clone();
        let model = model.into();

        let task = tokio::spawn(async move {
            sink.log("Processing your question...").await;

            match agent
                .run(history, &model, GenerateOptions::default(), &sink)
                .await
            {
                Ok(response) => {
                    sink.emit(AgentEvent::Complete {
                        content: response.content,
                    })
                    .await;
                }
                Err(FerretError::Cancelled) => {
                    tracing::debug!("streaming run cancelled by consumer");
                }
                Err(e) => {
                    tracing::error!(error = %e, transport = e.is_transport(), "streaming run failed");
                    sink.emit(AgentEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                }
            }
        });

        Ok(Box::pin(RunStream {
            events: ReceiverStream::new(rx),
            task,
        }))
    }

    /// Run the loop over `history`, reporting progress to `sink`
    ///
    /// Blocking and streaming mode both end up here; a disabled sink makes
    /// progress reporting free.
    pub async fn run(
        &self,
        history: Vec<Message>,
        model: &str,
        options: GenerateOptions,
        sink: &EventSink,
    ) -> Result<AgentResponse> {
        let tools = self.dispatcher.registry().definitions();
        let mut state = LoopState::new(
            self.with_system_prompt(history),
            self.config.agent.max_tool_rounds,
        );

        tracing::info!(
            model,
            client = self.model.name(),
            messages = state.messages.len(),
            tools = tools.len(),
            max_rounds = state.max_rounds,
            "starting agent loop"
        );

        loop {
            if sink.is_closed() {
                return Err(FerretError::Cancelled);
            }

            let request = CompletionRequest::with_tools(
                model,
                state.messages.clone(),
                tools.clone(),
                options,
                self.config.models.temperature,
            );

            // At the bound the finalization call replaces the tool-enabled call,
            // capping a run at max_rounds + 1 model calls. Do not add a tool-enabled
            // call here first.
            if state.at_bound() {
                return self.finalize(state, request.finalization(), sink).await;
            }

            if state.round == 0 {
                sink.log("Analyzing your question...").await;
            } else {
                sink.log(format!("Calling model (round {})...", state.round + 1))
                    .await;
            }

            let response = self.model.complete(&request).await?;
            state.record_call(response.usage.as_ref());

            tracing::info!(
                round = state.round,
                finish_reason = ?response.finish_reason,
                tool_calls = response.tool_calls.len(),
                call_tokens = response.usage.map(|u| u.total_tokens),
                total_tokens = state.usage.map(|u| u.total_tokens),
                "model responded"
            );

            let response_model = response.model.clone();
            match state.next_transition(response) {
                Transition::Answer(content) => {
                    tracing::info!(
                        rounds = state.round,
                        model_calls = state.model_calls,
                        "agent loop complete"
                    );
                    return Ok(state.finish(content, response_model));
                }
                Transition::RunTools(calls) => {
                    for call in &calls {
                        tracing::info!(
                            id = %call.id,
                            tool = %call.name,
                            arguments = %call.arguments,
                            "model requested tool"
                        );
                    }
                    sink.log(format!(
                        "Running tool round {} ({} tools)",
                        state.round + 1,
                        calls.len()
                    ))
                    .await;

                    let results = self.dispatcher.dispatch_with_progress(&calls, sink).await;
                    for result in &results {
                        tracing::debug!(
                            id = %result.tool_call_id,
                            success = result.success,
                            chars = result.content.len(),
                            "tool result"
                        );
                    }

                    if sink.is_closed() {
                        return Err(FerretError::Cancelled);
                    }
                    state.apply_tool_round(calls, results);
                }
            }
        }
    }

    /// Make the tool-free finalization call and end the loop with its answer
    ///
    /// Tool calls in the response are never executed.
    async fn finalize(
        &self,
        mut state: LoopState,
        request: CompletionRequest,
        sink: &EventSink,
    ) -> Result<AgentResponse> {
        tracing::info!(rounds = state.round, "round limit reached, forcing final answer");
        sink.log("Reached the tool round limit, writing the final answer...")
            .await;

        let response = self.model.complete(&request).await?;
        state.record_call(response.usage.as_ref());

        if response.has_tool_calls() {
            tracing::debug!(
                count = response.tool_calls.len(),
                "ignoring tool calls proposed in the final answer"
            );
        }
        tracing::info!(
            model_calls = state.model_calls,
            total_tokens = state.usage.map(|u| u.total_tokens),
            "agent loop complete"
        );

        let content = response.content.unwrap_or_default();
        Ok(state.finish(content, response.model))
    }

    /// Prepend the configured system prompt unless the history has one
    fn with_system_prompt(&self, mut history: Vec<Message>) -> Vec<Message> {
        if let Some(prompt) = &self.config.agent.system_prompt {
            if history.first().map(|m| m.role) != Some(Role::System) {
                history.insert(0, Message::system(prompt.clone()));
            }
        }
        history
    }
}

/// Event stream that aborts its producer when dropped
struct RunStream {
    events: ReceiverStream<AgentEvent>,
    task: JoinHandle<()>,
}

impl Stream for RunStream {
    type Item = AgentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<AgentEvent>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl ChatModel for Fixed {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            let first = request.messages.first().map(|m| m.role);
            Ok(CompletionResponse {
                content: Some(format!("first role: {:?}", first)),
                model: request.model.clone(),
                ..Default::default()
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn agent(config: Config) -> Agent {
        Agent::with_parts(config, Arc::new(Fixed), Arc::new(ToolRegistry::new()))
    }

    #[test]
    fn test_chat_request_builder() {
        let request = ChatRequest::new("hi").model("deepseek").temperature(0.2).max_tokens(64);
        assert_eq!(request.model.as_deref(), Some("deepseek"));
        assert_eq!(
            request.options(),
            GenerateOptions {
                temperature: Some(0.2),
                max_tokens: Some(64)
            }
        );
    }

    #[tokio::test]
    async fn test_blocking_uses_default_model() {
        let mut config = Config::default();
        config.models.default = "gpt-5".to_string();

        let response = agent(config)
            .run_blocking(ChatRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(response.model, "gpt-5");
        assert_eq!(response.content, "first role: Some(User)");
    }

    #[tokio::test]
    async fn test_system_prompt_is_prepended() {
        let mut config = Config::default();
        config.agent.system_prompt = Some("be brief".to_string());

        let response = agent(config)
            .run_blocking(ChatRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(response.content, "first role: Some(System)");
    }

    #[tokio::test]
    async fn test_streaming_rejects_bad_history() {
        let err = agent(Config::default())
            .run_streaming(vec![Message::assistant("hi")], "gpt-5")
            .err()
            .unwrap();
        assert!(matches!(err, FerretError::Validation(_)));
    }
}

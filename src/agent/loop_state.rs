//! Agent loop state management
//!
//! Tracks one request's rounds, message history and token usage, and decides
//! what the loop does with each model response.

use crate::core::{Message, ToolCall, ToolResult, Usage};
use crate::llm::CompletionResponse;

/// What the loop does after a tool-enabled model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Execute these calls, then call the model again
    RunTools(Vec<ToolCall>),
    /// The model answered without tools; this is the final answer
    Answer(String),
}

/// State of one agentic request
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Completed tool rounds
    pub round: usize,
    /// Tool rounds allowed before finalization is forced
    pub max_rounds: usize,
    /// Conversation sent to the model, growing as rounds complete
    pub messages: Vec<Message>,
    /// Usage summed over every model call so far
    pub usage: Option<Usage>,
    /// Model calls made so far
    pub model_calls: usize,
}

/// Final outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub content: String,
    /// Model that produced the final answer
    pub model: String,
    pub usage: Option<Usage>,
    /// Tool rounds executed
    pub rounds: usize,
    pub model_calls: usize,
}

impl LoopState {
    /// Create a new loop state over the initial history
    pub fn new(messages: Vec<Message>, max_rounds: usize) -> Self {
        Self {
            round: 0,
            max_rounds,
            messages,
            usage: None,
            model_calls: 0,
        }
    }

    /// Whether the next model call must be the tool-free finalization call
    pub fn at_bound(&self) -> bool {
        self.round >= self.max_rounds
    }

    /// Account for one model call
    pub fn record_call(&mut self, usage: Option<&Usage>) {
        self.model_calls += 1;
        Usage::accumulate(&mut self.usage, usage);
    }

    /// Decide the next step for a tool-enabled response
    pub fn next_transition(&self, response: CompletionResponse) -> Transition {
        if response.has_tool_calls() {
            Transition::RunTools(response.tool_calls)
        } else {
            Transition::Answer(response.content.unwrap_or_default())
        }
    }

    /// Append a finished tool round and advance the round counter
    ///
    /// `results` must hold one entry per call, in call order.
    pub fn apply_tool_round(&mut self, calls: Vec<ToolCall>, results: Vec<ToolResult>) {
        debug_assert_eq!(calls.len(), results.len());
        self.messages.push(Message::assistant_tool_calls(calls));
        self.messages.extend(results.into_iter().map(Message::tool));
        self.round += 1;
    }

    /// Consume the state into the final response
    pub fn finish(self, content: String, model: String) -> AgentResponse {
        AgentResponse {
            content,
            model,
            usage: self.usage,
            rounds: self.round,
            model_calls: self.model_calls,
        }
    }
}

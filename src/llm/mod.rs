//! LLM module - Language Model integrations
//!
//! Provides the model client abstraction and the AI Builder implementation.

pub mod ai_builder;
pub mod models;
pub mod traits;

pub use ai_builder::AiBuilderClient;
pub use models::*;
pub use traits::{ChatModel, CompletionRequest, CompletionResponse, GenerateOptions, ToolChoice};

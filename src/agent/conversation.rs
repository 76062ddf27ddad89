//! Conversation history management
//!
//! Holds the user-visible history of a chat and validates histories supplied
//! by callers before a streaming run starts.

use serde_json::Value;

use crate::core::{FerretError, Message, Result, Role};

/// User-visible chat history (user and assistant turns)
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from stored messages
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Drop the trailing user message, used when a run fails
    pub fn pop_user(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => self.messages.pop(),
            _ => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the first user message
    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::User)
    }

    /// Get the last user message
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Check that a history can start a run
///
/// It must be non-empty, end with a user message, and every user or system
/// message must carry content.
pub fn validate_history(history: &[Message]) -> Result<()> {
    for (i, msg) in history.iter().enumerate() {
        if matches!(msg.role, Role::User | Role::System) && msg.content.is_none() {
            return Err(FerretError::validation(format!(
                "message {} ({}) has no content",
                i + 1,
                msg.role
            )));
        }
        if msg.role == Role::Tool && msg.tool_call_id.is_none() {
            return Err(FerretError::validation(format!(
                "message {} is a tool result without tool_call_id",
                i + 1
            )));
        }
    }

    match history.last() {
        Some(last) if last.role == Role::User => Ok(()),
        _ => Err(FerretError::validation(
            "history must end with a user message",
        )),
    }
}

/// Parse and validate a history received as raw JSON
pub fn parse_history(value: &Value) -> Result<Vec<Message>> {
    let items = value
        .as_array()
        .ok_or_else(|| FerretError::validation("history must be an array"))?;

    let mut messages = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| {
            FerretError::validation(format!("message {} must be an object", i + 1))
        })?;
        if !obj.contains_key("role") || !obj.contains_key("content") {
            return Err(FerretError::validation(format!(
                "message {} is missing role or content",
                i + 1
            )));
        }
        let message: Message = serde_json::from_value(item.clone()).map_err(|e| {
            FerretError::validation(format!("message {} is malformed: {}", i + 1, e))
        })?;
        messages.push(message);
    }

    validate_history(&messages)?;
    Ok(messages)
}

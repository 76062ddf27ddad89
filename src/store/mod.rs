//! Conversation storage
//!
//! Durable mapping from conversation id to message history plus title and
//! timestamps. The agent never touches the store; callers load a history
//! before a run and save it afterwards.

mod file;
mod memory;

pub use file::FileConversationStore;
pub use memory::InMemoryConversationStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Message, Result, Role};

/// Title given to conversations that have nothing better yet
pub const DEFAULT_TITLE: &str = "New chat";

/// Characters of the first message kept in a generated title
const TITLE_CHARS: usize = 30;

/// A stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Index entry for a conversation, without its history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// New empty conversation
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    fn with_id(id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Replace the history, titling the record from its first user message
    /// when it still has no real title
    fn apply_save(&mut self, history: Vec<Message>, title: Option<&str>) {
        self.history = history;
        self.updated_at = Utc::now();

        match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => self.title = title.to_string(),
            None if self.title.is_empty() || self.title == DEFAULT_TITLE => {
                if let Some(first) = first_user_content(&self.history) {
                    self.title = generate_title(first);
                }
            }
            None => {}
        }
    }
}

/// Title for a conversation started with `message`
pub fn generate_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if trimmed.chars().count() > TITLE_CHARS {
        let head: String = trimmed.chars().take(TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// Title for a new record from the optional explicit title or first message
fn initial_title(title: Option<&str>, first_message: Option<&str>) -> String {
    match (title.filter(|t| !t.trim().is_empty()), first_message) {
        (Some(title), _) => title.trim().to_string(),
        (None, Some(message)) => generate_title(message),
        (None, None) => DEFAULT_TITLE.to_string(),
    }
}

fn first_user_content(history: &[Message]) -> Option<&str> {
    history
        .iter()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.content.as_deref())
        .filter(|c| !c.trim().is_empty())
}

/// Persistent conversation storage
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation
    ///
    /// The title is `title` if given, else generated from `first_message`,
    /// else the default title.
    async fn create(
        &self,
        title: Option<&str>,
        first_message: Option<&str>,
    ) -> Result<ConversationRecord>;

    /// Fetch a conversation; `NotFound` if it does not exist
    async fn get(&self, id: Uuid) -> Result<ConversationRecord>;

    /// All conversations, most recently updated first
    async fn list(&self) -> Result<Vec<ConversationSummary>>;

    /// Replace a conversation's history, creating the record if needed
    async fn save(
        &self,
        id: Uuid,
        history: Vec<Message>,
        title: Option<&str>,
    ) -> Result<ConversationRecord>;

    /// Rename a conversation; `NotFound` if it does not exist
    async fn update_title(&self, id: Uuid, title: &str) -> Result<ConversationRecord>;

    /// Delete a conversation; deleting a missing id is not an error
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Whether data survives a restart
    fn is_persistent(&self) -> bool;
}

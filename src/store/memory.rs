//! In-memory conversation store (non-persistent).

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{initial_title, ConversationRecord, ConversationStore, ConversationSummary, DEFAULT_TITLE};
use crate::core::{FerretError, Message, Result};

#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    records: Arc<RwLock<HashMap<Uuid, ConversationRecord>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(
        &self,
        title: Option<&str>,
        first_message: Option<&str>,
    ) -> Result<ConversationRecord> {
        let record = ConversationRecord::new(initial_title(title, first_message));
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<ConversationRecord> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| FerretError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let mut summaries: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .map(ConversationRecord::summary)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn save(
        &self,
        id: Uuid,
        history: Vec<Message>,
        title: Option<&str>,
    ) -> Result<ConversationRecord> {
        let mut records = self.records.write().await;
        let record = records
            .entry(id)
            .or_insert_with(|| ConversationRecord::with_id(id, DEFAULT_TITLE));
        record.apply_save(history, title);
        Ok(record.clone())
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<ConversationRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| FerretError::NotFound(id.to_string()))?;
        record.title = title.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.records.write().await.remove(&id);
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

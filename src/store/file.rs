//! JSON file conversation store
//!
//! One `<id>.json` file per conversation plus an `index.json` of summaries
//! so listing never reads full histories.

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{initial_title, ConversationRecord, ConversationStore, ConversationSummary, DEFAULT_TITLE};
use crate::core::{FerretError, Message, Result};

const INDEX_FILE: &str = "index.json";

pub struct FileConversationStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on the index and record files
    write_lock: Mutex<()>,
}

impl FileConversationStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "opened conversation store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Load the index; a missing or unreadable index is treated as empty
    async fn load_index(&self) -> Vec<ConversationSummary> {
        let content = match fs::read_to_string(self.index_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "failed to read conversation index");
                return Vec::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::error!(error = %e, "conversation index is corrupt, starting empty");
            Vec::new()
        })
    }

    async fn save_index(&self, index: &[ConversationSummary]) -> Result<()> {
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), json).await?;
        Ok(())
    }

    /// Replace or append the summary for `record` in the index
    async fn upsert_index(&self, record: &ConversationRecord) -> Result<()> {
        let mut index = self.load_index().await;
        let summary = record.summary();
        match index.iter_mut().find(|s| s.id == record.id) {
            Some(existing) => *existing = summary,
            None => index.push(summary),
        }
        self.save_index(&index).await
    }

    async fn read_record(&self, id: Uuid) -> Result<Option<ConversationRecord>> {
        match fs::read_to_string(self.record_path(id)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, record: &ConversationRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.record_path(record.id), json).await?;
        self.upsert_index(record).await
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn create(
        &self,
        title: Option<&str>,
        first_message: Option<&str>,
    ) -> Result<ConversationRecord> {
        let record = ConversationRecord::new(initial_title(title, first_message));

        let _guard = self.write_lock.lock().await;
        self.write_record(&record).await?;
        tracing::info!(id = %record.id, title = %record.title, "created conversation");
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<ConversationRecord> {
        self.read_record(id)
            .await?
            .ok_or_else(|| FerretError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let mut index = self.load_index().await;
        index.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(index)
    }

    async fn save(
        &self,
        id: Uuid,
        history: Vec<Message>,
        title: Option<&str>,
    ) -> Result<ConversationRecord> {
        let _guard = self.write_lock.lock().await;

        let mut record = match self.read_record(id).await? {
            Some(record) => record,
            None => {
                tracing::debug!(%id, "saving unknown conversation, creating it");
                ConversationRecord::with_id(id, DEFAULT_TITLE)
            }
        };
        record.apply_save(history, title);
        self.write_record(&record).await?;

        tracing::debug!(%id, messages = record.history.len(), "saved conversation");
        Ok(record)
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<ConversationRecord> {
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .read_record(id)
            .await?
            .ok_or_else(|| FerretError::NotFound(id.to_string()))?;
        record.title = title.to_string();
        record.updated_at = Utc::now();
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut index = self.load_index().await;
        index.retain(|s| s.id != id);
        self.save_index(&index).await?;

        tracing::info!(%id, "deleted conversation");
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

//! JSON file storage under `<root>/.fractal/`
//!
//! ```text
//! .fractal/
//!   conversations/<uuid>.json
//!   transcript.json
//!   state.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::{log_debug, log_error, log_warn};
use super::error::{StoreError, StoreResult};
use super::traits::ConversationStore;
use super::types::{Conversation, ConversationMetadata, Transcript, UiState};

/// Project-local storage directory name
pub const FRACTAL_DIR: &str = ".fractal";

pub struct FileConversationStore {
    base_dir: PathBuf,
    logger: SharedLogger,
}

impl FileConversationStore {
    /// Store rooted at `<workspace_root>/.fractal`
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            base_dir: workspace_root.as_ref().join(FRACTAL_DIR),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.base_dir.join("conversations")
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.base_dir.join("transcript.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.base_dir.join("state.json")
    }

    fn conversation_path(&self, id: &str) -> StoreResult<PathBuf> {
        let valid = !id.is_empty()
            && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.conversations_dir().join(format!("{}.json", id)))
    }

    /// Pretty-printed JSON, written to a sibling temp file then renamed into place
    async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
        context: &'static str,
    ) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(StoreError::io(context))?;
        }
        let body = serde_json::to_string_pretty(value)?;
        // Unique per write so overlapping saves of one file never share a temp
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp, body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(context)(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(context)(e));
        }
        Ok(())
    }

    async fn read_conversation(path: &Path) -> Option<Conversation> {
        let text = tokio::fs::read_to_string(path).await.ok()?;
        serde_json::from_str(&text).ok()
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn create(&self) -> StoreResult<Conversation> {
        let conversation = Conversation::new(uuid::Uuid::new_v4().to_string());
        self.save(&conversation).await?;
        log_debug!(self.logger, "[store] Created conversation {}", conversation.id);
        Ok(conversation)
    }

    async fn save(&self, conversation: &Conversation) -> StoreResult<()> {
        let path = self.conversation_path(&conversation.id)?;
        self.write_json(&path, conversation, "Failed to save conversation")
            .await
            .inspect_err(|e| log_error!(self.logger, "[store] {} ({})", e, conversation.id))
    }

    async fn load(&self, id: &str) -> StoreResult<Conversation> {
        let path = self.conversation_path(id).map_err(|_| StoreError::NotFound(id.to_string()))?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(StoreError::Io {
                context: "Failed to load conversation",
                source: e,
            }),
        }
    }

    async fn list(&self) -> StoreResult<Vec<ConversationMetadata>> {
        let mut entries = match tokio::fs::read_dir(self.conversations_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    context: "Failed to list conversations",
                    source: e,
                })
            }
        };

        let mut conversations = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io("Failed to list conversations"))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_conversation(&path).await {
                Some(conversation) => conversations.push(ConversationMetadata::for_conversation(&conversation)),
                None => log_warn!(self.logger, "[store] Skipping unreadable {}", path.display()),
            }
        }

        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.conversation_path(id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(StoreError::io("Failed to delete conversation"))
            .inspect_err(|e| log_error!(self.logger, "[store] {} ({})", e, id))
    }

    async fn save_transcript(&self, transcript: &Transcript) -> StoreResult<()> {
        let path = self.transcript_path();
        self.write_json(&path, transcript, "Failed to save transcript").await?;
        log_debug!(self.logger, "[store] Transcript saved to {}", path.display());
        Ok(())
    }

    async fn save_ui_state(&self, state: &UiState) -> StoreResult<()> {
        self.write_json(&self.state_path(), state, "Failed to save UI state").await
    }

    async fn load_ui_state(&self) -> Option<UiState> {
        let text = tokio::fs::read_to_string(self.state_path()).await.ok()?;
        serde_json::from_str(&text)
            .inspect_err(|e| log_warn!(self.logger, "[store] Ignoring unreadable UI state: {}", e))
            .ok()
    }
}

impl std::fmt::Debug for FileConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConversationStore")
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

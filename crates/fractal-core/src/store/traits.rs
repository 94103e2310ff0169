//! Storage collaborator trait

use async_trait::async_trait;

use super::error::StoreResult;
use super::types::{Conversation, ConversationMetadata, Transcript, UiState};

/// Conversation persistence used by the bridge
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create and persist an empty conversation
    async fn create(&self) -> StoreResult<Conversation>;

    async fn save(&self, conversation: &Conversation) -> StoreResult<()>;

    /// Fails with `StoreError::NotFound` when absent
    async fn load(&self, id: &str) -> StoreResult<Conversation>;

    /// Newest first; unreadable entries are skipped
    async fn list(&self) -> StoreResult<Vec<ConversationMetadata>>;

    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Overwrite the transcript export
    async fn save_transcript(&self, transcript: &Transcript) -> StoreResult<()>;

    async fn save_ui_state(&self, state: &UiState) -> StoreResult<()>;

    /// `None` when no state was saved or it cannot be read
    async fn load_ui_state(&self) -> Option<UiState>;
}

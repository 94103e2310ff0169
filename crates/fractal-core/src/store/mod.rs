//! Conversation storage
//!
//! One JSON file per conversation, plus the transcript export and the
//! webview UI state, all under the workspace's `.fractal/` directory.

mod error;
mod types;
mod traits;
mod file;

pub use error::{StoreError, StoreResult};
pub use types::{conversation_label, Conversation, ConversationMetadata, Transcript, UiState};
pub use traits::ConversationStore;
pub use file::{FileConversationStore, FRACTAL_DIR};

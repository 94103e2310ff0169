//! Storage errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No conversation with this id
    #[error("Conversation not found")]
    NotFound(String),

    /// Id that cannot name a conversation file
    #[error("Invalid conversation id: {0}")]
    InvalidId(String),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid conversation data: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| StoreError::Io { context, source }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

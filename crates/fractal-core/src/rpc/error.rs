//! Bridge errors

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur on either side of the bridge
#[derive(Error, Debug)]
pub enum RpcError {
    /// The other side answered with an error
    #[error("{0}")]
    Remote(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid arguments for {method}: {message}")]
    InvalidArguments { method: String, message: String },

    #[error("Duplicate request id: {0}")]
    DuplicateId(String),

    /// A frame that was consumed whole; the next one can still be read
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Framing lost; nothing after this point can be trusted
    #[error("Stream out of sync: {0}")]
    Desync(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RpcResult<T> = Result<T, RpcError>;

//! Conversation orchestration
//!
//! - `Orchestrator`: runs the tool-use loop for one user turn
//! - `AuditLog`: every model exchange, for transcript export
//! - `format_chat_error`: the text shown when a turn fails

mod error;
mod audit;
mod orchestrator;

pub use error::{format_chat_error, ChatError, ChatResult, CREDENTIALS_GUIDANCE};
pub use audit::{AuditLog, Exchange, MAX_EXCHANGES};
pub use orchestrator::{ChatOutcome, Orchestrator};

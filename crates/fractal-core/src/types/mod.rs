//! Core types shared by the orchestrator, tools and bridge

mod message;
mod tool;
mod cancellation;

pub use message::{ChatMessage, ContentPart, MessageRole, MessageContent};
pub use tool::{Tool, ToolCall, ToolResult};
pub use cancellation::CancellationToken;

//! Fractal Tutor core
//!
//! Host-side engines for an editor tutor: a UI ↔ host bridge, the tool-use
//! orchestration loop against the Messages API, the workspace tools the model
//! may call, and the terminal activity tracker feeding them.
//!
//! ```text
//! UI ──▶ rpc::RpcServer ──▶ rpc::TutorApi ──▶ store::ConversationStore
//!                                   │
//!                                   ▼
//!                          chat::Orchestrator ──▶ providers::ModelClient
//!                                   │
//!                                   ▼
//!                          tools::ToolRegistry ──▶ context::ContextGatherer ──▶ terminal::TerminalTracker
//! ```
//!
//! ```rust,ignore
//! use fractal_core::{ConsoleLogger, TutorSession};
//!
//! let session = TutorSession::open("/path/to/workspace", Arc::new(ConsoleLogger::new()));
//! session.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod credentials;
pub mod terminal;
pub mod context;
pub mod tools;
pub mod providers;
pub mod chat;
pub mod store;
pub mod rpc;
pub mod session;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, ContentPart, MessageContent, MessageRole, Tool, ToolCall, ToolResult,
};

pub use logging::{ConsoleLogger, FileLogger, LogLevel, Logger, NoOpLogger, SharedLogger};

pub use config::{resolve_settings, SettingsLayer, SettingsProvider, TutorSettings};

pub use credentials::{CredentialChain, CredentialSource, KeychainCredentials, ResolvedCredential};

pub use terminal::{sanitize, output_preview, CommandExecution, ExecutionId, TerminalTracker};

pub use context::{ContextGatherer, ContextSnapshot, EditorEnvironment, StaticEnvironment};

pub use tools::{ToolExecutor, ToolRegistry};

pub use providers::{AnthropicClient, ModelClient, ModelRequest, ModelResponse, ProviderError, ScriptedModel, StopReason};

pub use chat::{format_chat_error, AuditLog, ChatError, ChatOutcome, Orchestrator};

pub use store::{Conversation, ConversationMetadata, ConversationStore, FileConversationStore, UiState};

pub use rpc::{Envelope, RpcClient, RpcError, RpcRequest, RpcServer, TutorApi};

pub use session::TutorSession;

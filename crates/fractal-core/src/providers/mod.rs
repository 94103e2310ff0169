//! Remote model clients
//!
//! - `AnthropicClient`: Messages API over reqwest
//! - `ScriptedModel`: canned responses for tests

mod error;
mod types;
mod traits;
mod anthropic;
mod scripted;

pub use error::{ErrorKind, ProviderError, ProviderResult};
pub use types::{ModelRequest, ModelResponse, StopReason, Usage};
pub use traits::ModelClient;
pub use anthropic::{AnthropicClient, ANTHROPIC_VERSION};
pub use scripted::{ScriptedModel, ScriptedReply, WhenExhausted};

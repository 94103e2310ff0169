//! Chat turn errors and their user-facing rendering

use thiserror::Error;

use crate::providers::{ErrorKind, ProviderError};

/// Shown instead of an answer when no API key could be resolved
pub const CREDENTIALS_GUIDANCE: &str = "⚙️  **API Key Required**

To use Fractal Tutor, you need to configure your Anthropic API key:

1. Get an API key from https://console.anthropic.com/
2. Store it with `fractal-host set-key`, or export `FRACTAL_API_KEY`
3. Alternatively set `api_key` in `.fractal/config.yaml`

Then restart the host and try again!";

/// Why a chat turn ended without an answer
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Model still requested tools after {rounds} rounds")]
    ToolLoopExceeded { rounds: usize },

    #[error("No API key configured")]
    MissingCredentials,

    #[error("Chat cancelled")]
    Cancelled,
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Render a turn-ending error as the text shown in place of an answer
pub fn format_chat_error(error: &ChatError) -> String {
    match error {
        ChatError::MissingCredentials => CREDENTIALS_GUIDANCE.to_string(),
        ChatError::ToolLoopExceeded { rounds } => format!(
            "🔁 I stopped after {} tool rounds without reaching an answer. Try asking a more specific question.",
            rounds
        ),
        ChatError::Cancelled => "⏹️  Request cancelled.".to_string(),
        ChatError::Provider(ProviderError::Cancelled) => "⏹️  Request cancelled.".to_string(),
        ChatError::Provider(ProviderError::MissingApiKey { .. }) => CREDENTIALS_GUIDANCE.to_string(),
        ChatError::Provider(e) => match e.kind() {
            ErrorKind::Unauthorized => {
                "❌ Invalid API key. Please check your Fractal Tutor settings.".to_string()
            }
            ErrorKind::RateLimited => {
                "⏸️  Rate limit reached. Please wait a moment and try again.".to_string()
            }
            ErrorKind::ServiceFault if e.status().is_none() => {
                "⏸️  Claude is overloaded right now. Please try again in a few seconds.".to_string()
            }
            ErrorKind::ServiceFault => {
                "⚠️  Anthropic service is experiencing issues. Please try again in a moment.".to_string()
            }
            ErrorKind::Other => format!("❌ Error: {}", e),
        },
    }
}

//! Model client trait definition

use async_trait::async_trait;

use crate::types::CancellationToken;
use super::error::ProviderResult;
use super::types::{ModelRequest, ModelResponse};

/// A remote language model that answers one complete request at a time
///
/// Implementations:
/// - `AnthropicClient`: Messages API over HTTPS
/// - `ScriptedModel`: replays queued responses (tests)
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Send `request` and wait for the whole response.
    ///
    /// Must return `ProviderError::Cancelled` promptly once `cancel` fires.
    async fn create_message(
        &self,
        request: ModelRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<ModelResponse>;
}

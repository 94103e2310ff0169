//! Calling side of the bridge
//!
//! Each call gets a fresh `rpc-N` id and a pending completion; responses are
//! matched by id only, so they may arrive in any order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::AsyncBufRead;
use tokio::sync::oneshot;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::store::{Conversation, ConversationMetadata, UiState};
use crate::types::CancellationToken;
use crate::{log_debug, log_warn};
use super::error::{RpcError, RpcResult};
use super::protocol::{Envelope, RpcRequest, RpcRequestEnvelope, RpcResponseEnvelope};
use super::transport::{read_frame, MessageChannel};

/// Default per-call deadline
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(300);

type Completion = oneshot::Sender<RpcResult<Value>>;

pub struct RpcClient {
    outbound: Arc<dyn MessageChannel>,
    pending: Mutex<HashMap<String, Completion>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    timeout: Duration,
    logger: SharedLogger,
}

impl RpcClient {
    pub fn new(outbound: Arc<dyn MessageChannel>) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            timeout: DEFAULT_RPC_TIMEOUT,
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Issue `request` and wait for its response
    pub async fn call(&self, request: RpcRequest) -> RpcResult<Value> {
        self.call_with_cancel(request, None).await
    }

    /// Like [`RpcClient::call`], abandoning the call when `cancel` fires.
    ///
    /// On timeout or cancellation the pending entry is removed, so a late
    /// response is discarded as unknown.
    pub async fn call_with_cancel(
        &self,
        request: RpcRequest,
        cancel: Option<&CancellationToken>,
    ) -> RpcResult<Value> {
        if self.is_closed() {
            return Err(RpcError::ChannelClosed);
        }

        let id = format!("rpc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let envelope = RpcRequestEnvelope::new(id.clone(), &request)?;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        // close() may have drained the map between the check above and the insert
        if self.is_closed() {
            self.pending.lock().remove(&id);
            return Err(RpcError::ChannelClosed);
        }

        log_debug!(self.logger, "[RpcClient] {} ({})", envelope.method, id);
        if let Err(e) = self.outbound.send(&Envelope::RpcRequest(envelope)).await {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        let wait = tokio::time::timeout(self.timeout, rx);
        let outcome = match cancel {
            Some(token) => token.run_until_cancelled(wait).await,
            None => Some(wait.await),
        };

        match outcome {
            Some(Ok(Ok(result))) => result,
            Some(Ok(Err(_dropped))) => Err(RpcError::ChannelClosed),
            Some(Err(_elapsed)) => {
                self.pending.lock().remove(&id);
                log_warn!(self.logger, "[RpcClient] {} timed out", id);
                Err(RpcError::Timeout)
            }
            None => {
                self.pending.lock().remove(&id);
                Err(RpcError::Cancelled)
            }
        }
    }

    /// Call and decode the result
    pub async fn call_as<T: DeserializeOwned>(&self, request: RpcRequest) -> RpcResult<T> {
        let value = self.call(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Complete the call `response` answers.
    ///
    /// Returns false (and does nothing else) when no call is pending under
    /// that id.
    pub fn handle_response(&self, response: RpcResponseEnvelope) -> bool {
        let Some(tx) = self.pending.lock().remove(&response.id) else {
            log_debug!(self.logger, "[RpcClient] Discarding response for unknown id {}", response.id);
            return false;
        };
        // The caller may have stopped waiting; nothing to do then.
        let _ = tx.send(response.into_result());
        true
    }

    /// Reject every pending call with `ChannelClosed` and refuse new ones
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<Completion> = self.pending.lock().drain().map(|(_, tx)| tx).collect();
        for tx in drained {
            let _ = tx.send(Err(RpcError::ChannelClosed));
        }
    }

    /// Feed responses from `reader` until it ends, then close.
    ///
    /// Other message types are handed to `on_other`.
    pub async fn listen<R, F>(&self, reader: &mut R, mut on_other: F)
    where
        R: AsyncBufRead + Unpin,
        F: FnMut(Envelope),
    {
        loop {
            match read_frame(reader).await {
                Ok(Some(value)) => match Envelope::decode(value) {
                    Ok(Envelope::RpcResponse(response)) => {
                        self.handle_response(response);
                    }
                    Ok(other) => on_other(other),
                    Err((_, e)) => log_warn!(self.logger, "[RpcClient] Ignoring message: {}", e),
                },
                Ok(None) => break,
                Err(RpcError::InvalidFrame(e)) => log_warn!(self.logger, "[RpcClient] {}", e),
                Err(e) => {
                    log_warn!(self.logger, "[RpcClient] Read failed: {}", e);
                    break;
                }
            }
        }
        self.close();
    }

    pub async fn create_conversation(&self) -> RpcResult<String> {
        self.call_as(RpcRequest::CreateConversation {}).await
    }

    pub async fn list_conversations(&self) -> RpcResult<Vec<ConversationMetadata>> {
        self.call_as(RpcRequest::ListConversations {}).await
    }

    pub async fn load_conversation(&self, id: &str) -> RpcResult<Conversation> {
        self.call_as(RpcRequest::LoadConversation { id: id.to_string() }).await
    }

    pub async fn delete_conversation(&self, id: &str) -> RpcResult<()> {
        self.call(RpcRequest::DeleteConversation { id: id.to_string() }).await.map(|_| ())
    }

    pub async fn send_message(&self, conversation_id: &str, message: &str) -> RpcResult<String> {
        self.call_as(RpcRequest::SendMessage {
            conversation_id: conversation_id.to_string(),
            message: message.to_string(),
        })
        .await
    }

    pub async fn save_transcript(&self, conversation_id: &str) -> RpcResult<()> {
        self.call(RpcRequest::SaveTranscript {
            conversation_id: conversation_id.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn save_ui_state(&self, state: UiState) -> RpcResult<()> {
        self.call(RpcRequest::SaveUiState { state }).await.map(|_| ())
    }

    pub async fn load_ui_state(&self) -> RpcResult<Option<UiState>> {
        self.call_as(RpcRequest::LoadUiState {}).await
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::MemoryChannel;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn client() -> (Arc<RpcClient>, UnboundedReceiver<Envelope>) {
        let (channel, rx) = MemoryChannel::pair();
        (Arc::new(RpcClient::new(Arc::new(channel))), rx)
    }

    async fn next_request(rx: &mut UnboundedReceiver<Envelope>) -> RpcRequestEnvelope {
        match rx.recv().await.unwrap() {
            Envelope::RpcRequest(request) => request,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (client, mut rx) = client();
        let a = tokio::spawn({
            let client = client.clone();
            async move { client.call(RpcRequest::CreateConversation {}).await }
        });
        let first = next_request(&mut rx).await;
        let b = tokio::spawn({
            let client = client.clone();
            async move { client.call(RpcRequest::ListConversations {}).await }
        });
        let second = next_request(&mut rx).await;
        assert_eq!(first.id, "rpc-0");
        assert_eq!(second.id, "rpc-1");

        assert!(client.handle_response(RpcResponseEnvelope::ok(second.id, json!(["b"]))));
        assert!(client.handle_response(RpcResponseEnvelope::ok(first.id, json!("a"))));

        assert_eq!(a.await.unwrap().unwrap(), json!("a"));
        assert_eq!(b.await.unwrap().unwrap(), json!(["b"]));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_ignored() {
        let (client, mut rx) = client();
        let call = tokio::spawn({
            let client = client.clone();
            async move { client.call(RpcRequest::LoadUiState {}).await }
        });
        let request = next_request(&mut rx).await;

        assert!(!client.handle_response(RpcResponseEnvelope::ok("rpc-999", json!(1))));
        assert_eq!(client.pending_count(), 1);

        client.handle_response(RpcResponseEnvelope::err(request.id, "boom"));
        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_late_response() {
        let (channel, mut rx) = MemoryChannel::pair();
        let client = RpcClient::new(Arc::new(channel)).with_timeout(Duration::from_secs(5));

        let err = client.call(RpcRequest::ListConversations {}).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout));
        assert_eq!(client.pending_count(), 0);

        let request = next_request(&mut rx).await;
        assert!(!client.handle_response(RpcResponseEnvelope::ok(request.id, json!([]))));
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let (client, _rx) = client();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .call_with_cancel(RpcRequest::ListConversations {}, Some(&cancel))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Cancelled));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_close_rejects_pending() {
        let (client, mut rx) = client();
        let call = tokio::spawn({
            let client = client.clone();
            async move { client.call(RpcRequest::ListConversations {}).await }
        });
        next_request(&mut rx).await;

        client.close();
        assert!(matches!(call.await.unwrap(), Err(RpcError::ChannelClosed)));
        assert!(matches!(
            client.call(RpcRequest::ListConversations {}).await,
            Err(RpcError::ChannelClosed)
        ));
    }
}

//! The eight bridge procedures, backed by storage and the orchestrator

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::chat::{format_chat_error, ChatError, Orchestrator};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::store::{ConversationStore, Transcript};
use crate::types::{CancellationToken, ChatMessage};
use crate::{log_error, log_info};
use super::error::{RpcError, RpcResult};
use super::protocol::RpcRequest;
use super::server::RpcHandler;

pub struct TutorApi {
    store: Arc<dyn ConversationStore>,
    orchestrator: Arc<Orchestrator>,
    /// Serializes read-modify-write of one conversation across concurrent sends
    conversation_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    logger: SharedLogger,
}

impl TutorApi {
    pub fn new(store: Arc<dyn ConversationStore>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            conversation_locks: Mutex::new(HashMap::new()),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    fn conversation_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.conversation_locks
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Append the user turn, run the turn, append the answer
    async fn send_message(
        &self,
        conversation_id: &str,
        message: String,
        cancel: &CancellationToken,
    ) -> RpcResult<String> {
        // No lock entry for ids that were never stored
        self.store.load(conversation_id).await?;
        let lock = self.conversation_lock(conversation_id);
        let _guard = lock.lock().await;

        // Reloaded under the lock; a delete that ran first surfaces as NotFound
        let mut conversation = self.store.load(conversation_id).await?;
        conversation.messages.push(ChatMessage::user(message));
        self.store.save(&conversation).await?;

        let answer = match self.orchestrator.chat_in(conversation_id, &conversation.messages, cancel).await {
            Ok(outcome) => {
                log_info!(
                    self.logger,
                    "[TutorApi] Turn in {} finished after {} tool round(s)",
                    conversation_id,
                    outcome.tool_rounds
                );
                outcome.text
            }
            Err(ChatError::Cancelled) => return Err(RpcError::Cancelled),
            Err(e) => {
                log_error!(self.logger, "[TutorApi] Turn in {} failed: {}", conversation_id, e);
                format_chat_error(&e)
            }
        };

        conversation.messages.push(ChatMessage::assistant(answer.clone()));
        self.store.save(&conversation).await?;
        Ok(answer)
    }

    async fn save_transcript(&self, conversation_id: &str) -> RpcResult<()> {
        let conversation = self.store.load(conversation_id).await?;
        let transcript = Transcript::new(
            conversation,
            self.orchestrator.system_prompt(),
            self.orchestrator.audit_log().for_conversation(conversation_id),
        );
        self.store.save_transcript(&transcript).await?;
        Ok(())
    }
}

#[async_trait]
impl RpcHandler for TutorApi {
    async fn handle(&self, request: RpcRequest, cancel: &CancellationToken) -> RpcResult<Value> {
        match request {
            RpcRequest::CreateConversation {} => {
                let conversation = self.store.create().await?;
                Ok(json!(conversation.id))
            }
            RpcRequest::ListConversations {} => Ok(serde_json::to_value(self.store.list().await?)?),
            RpcRequest::LoadConversation { id } => Ok(serde_json::to_value(self.store.load(&id).await?)?),
            RpcRequest::DeleteConversation { id } => {
                let lock = self.conversation_lock(&id);
                let _guard = lock.lock().await;
                let deleted = self.store.delete(&id).await;
                self.conversation_locks.lock().remove(&id);
                deleted?;
                self.orchestrator.audit_log().forget_conversation(&id);
                Ok(Value::Null)
            }
            RpcRequest::SendMessage {
                conversation_id,
                message,
            } => Ok(json!(self.send_message(&conversation_id, message, cancel).await?)),
            RpcRequest::SaveTranscript { conversation_id } => {
                self.save_transcript(&conversation_id).await?;
                Ok(Value::Null)
            }
            RpcRequest::SaveUiState { state } => {
                self.store.save_ui_state(&state).await?;
                Ok(Value::Null)
            }
            RpcRequest::LoadUiState {} => Ok(serde_json::to_value(self.store.load_ui_state().await)?),
        }
    }
}

impl std::fmt::Debug for TutorApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorApi")
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

//! Serving side of the bridge

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::types::CancellationToken;
use crate::{log_debug, log_error, log_warn};
use super::error::{RpcError, RpcResult};
use super::protocol::{Envelope, RpcRequest, RpcRequestEnvelope, RpcResponseEnvelope};
use super::transport::MessageChannel;

/// Executes decoded requests
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, request: RpcRequest, cancel: &CancellationToken) -> RpcResult<Value>;
}

/// Dispatches requests to a handler and answers each exactly once
pub struct RpcServer {
    handler: Arc<dyn RpcHandler>,
    outbound: Arc<dyn MessageChannel>,
    seen: Mutex<HashSet<String>>,
    shutdown: CancellationToken,
    logger: SharedLogger,
}

impl RpcServer {
    pub fn new(handler: Arc<dyn RpcHandler>, outbound: Arc<dyn MessageChannel>) -> Self {
        Self {
            handler,
            outbound,
            seen: Mutex::new(HashSet::new()),
            shutdown: CancellationToken::new(),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Token handed to every handler; cancelled by [`RpcServer::shutdown`]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Abandon in-flight handlers (e.g. the UI went away)
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Serve `envelope` on its own task so calls interleave
    pub fn handle(self: &Arc<Self>, envelope: RpcRequestEnvelope) -> JoinHandle<()> {
        let server = Arc::clone(self);
        tokio::spawn(async move { server.respond(envelope).await })
    }

    /// Answer a request that could not be decoded but has an id
    pub async fn reject(&self, id: String, message: String) {
        log_warn!(self.logger, "[RpcServer] Rejecting malformed request {}: {}", id, message);
        let error = if self.seen.lock().insert(id.clone()) {
            format!("Invalid request: {}", message)
        } else {
            RpcError::DuplicateId(id.clone()).to_string()
        };
        self.send(RpcResponseEnvelope::err(id, error)).await;
    }

    /// Process `envelope` and send its single response
    pub async fn respond(&self, envelope: RpcRequestEnvelope) {
        let response = self.process(envelope).await;
        self.send(response).await;
    }

    async fn send(&self, response: RpcResponseEnvelope) {
        let id = response.id.clone();
        if let Err(e) = self.outbound.send(&Envelope::RpcResponse(response)).await {
            log_error!(self.logger, "[RpcServer] Failed to send response {}: {}", id, e);
        }
    }

    async fn process(&self, envelope: RpcRequestEnvelope) -> RpcResponseEnvelope {
        let id = envelope.id.clone();
        if !self.seen.lock().insert(id.clone()) {
            log_warn!(self.logger, "[RpcServer] Duplicate request id {}", id);
            return RpcResponseEnvelope::err(id.clone(), RpcError::DuplicateId(id).to_string());
        }

        let request = match envelope.request() {
            Ok(request) => request,
            Err(e) => {
                log_warn!(self.logger, "[RpcServer] {} ({})", e, id);
                return RpcResponseEnvelope::err(id, e.to_string());
            }
        };

        let method = request.method();
        log_debug!(self.logger, "[RpcServer] Dispatching {} ({})", method, id);
        let outcome = AssertUnwindSafe(self.handler.handle(request, &self.shutdown))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => RpcResponseEnvelope::ok(id, result),
            Ok(Err(e)) => {
                log_warn!(self.logger, "[RpcServer] {} ({}) failed: {}", method, id, e);
                RpcResponseEnvelope::err(id, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log_error!(self.logger, "[RpcServer] {} ({}) panicked: {}", method, id, message);
                RpcResponseEnvelope::err(id, message)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("dispatched", &self.seen.lock().len())
            .finish()
    }
}

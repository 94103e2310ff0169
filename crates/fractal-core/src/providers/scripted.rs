//! Scripted model for testing
//!
//! Replays a queue of canned responses (or errors) without network access and
//! records every request it receives.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::logging::{Logger, NoOpLogger};
use crate::log_debug;
use crate::types::{CancellationToken, ContentPart};
use super::error::{ProviderError, ProviderResult};
use super::traits::ModelClient;
use super::types::{ModelRequest, ModelResponse};

/// One scripted step
#[derive(Debug)]
pub enum ScriptedReply {
    Respond(ModelResponse),
    Fail(ProviderError),
}

/// What to do once the script runs out
#[derive(Debug, Clone)]
pub enum WhenExhausted {
    /// Return `ProviderError::Other`
    Fail,
    /// Keep answering with this response
    Repeat(ModelResponse),
}

/// Deterministic `ModelClient` driven by a queue of replies
pub struct ScriptedModel {
    script: Mutex<VecDeque<ScriptedReply>>,
    exhausted: WhenExhausted,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Duration,
    logger: Arc<dyn Logger>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            exhausted: WhenExhausted::Fail,
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            logger: Arc::new(NoOpLogger),
        }
    }

    /// A model that asks for the same tool call forever
    pub fn always_tool_use(name: &str, input: Value) -> Self {
        let mut model = Self::new();
        model.exhausted = WhenExhausted::Repeat(ModelResponse::tool_use(vec![ContentPart::tool_use(
            "toolu_repeat",
            name,
            input,
        )]));
        model
    }

    pub fn then(self, response: ModelResponse) -> Self {
        self.script.lock().push_back(ScriptedReply::Respond(response));
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.then(ModelResponse::text(text))
    }

    /// Queue a tool-use response invoking `calls` as `(id, name, input)`
    pub fn then_tools(self, calls: &[(&str, &str, Value)]) -> Self {
        let content = calls
            .iter()
            .map(|(id, name, input)| ContentPart::tool_use(*id, *name, input.clone()))
            .collect();
        self.then(ModelResponse::tool_use(content))
    }

    pub fn then_error(self, error: ProviderError) -> Self {
        self.script.lock().push_back(ScriptedReply::Fail(error));
        self
    }

    /// Wait this long before answering (cancellation is honoured while waiting)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_message(
        &self,
        request: ModelRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<ModelResponse> {
        self.requests.lock().push(request);

        if !self.delay.is_zero()
            && cancel.run_until_cancelled(tokio::time::sleep(self.delay)).await.is_none()
        {
            return Err(ProviderError::Cancelled);
        }
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let next = self.script.lock().pop_front();
        log_debug!(self.logger, "[ScriptedModel] call {} ({} left)", self.call_count(), self.remaining());
        match next {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Fail(error)) => Err(error),
            None => match &self.exhausted {
                WhenExhausted::Repeat(response) => Ok(response.clone()),
                WhenExhausted::Fail => Err(ProviderError::Other("Scripted model has no more responses".into())),
            },
        }
    }
}

//! Full-fidelity record of model exchanges
//!
//! The conversation file keeps only user and final assistant text; every
//! request and response (tool blocks included) is kept here for transcript
//! export. Only the newest [`MAX_EXCHANGES`] are retained.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::providers::{ModelRequest, ModelResponse};

/// Exchanges kept before the oldest is dropped
pub const MAX_EXCHANGES: usize = 200;

/// One model round-trip
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Round within the turn; 0 is the initial submission
    pub round: usize,
    pub timestamp: DateTime<Utc>,
    pub request: ModelRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ModelResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded exchange log for one session
#[derive(Debug, Default)]
pub struct AuditLog {
    exchanges: Mutex<VecDeque<Exchange>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_response(
        &self,
        conversation_id: Option<&str>,
        round: usize,
        request: ModelRequest,
        response: ModelResponse,
    ) {
        self.push(Exchange {
            conversation_id: conversation_id.map(str::to_string),
            round,
            timestamp: Utc::now(),
            request,
            response: Some(response),
            error: None,
        });
    }

    pub fn record_error(
        &self,
        conversation_id: Option<&str>,
        round: usize,
        request: ModelRequest,
        error: impl Into<String>,
    ) {
        self.push(Exchange {
            conversation_id: conversation_id.map(str::to_string),
            round,
            timestamp: Utc::now(),
            request,
            response: None,
            error: Some(error.into()),
        });
    }

    fn push(&self, exchange: Exchange) {
        let mut exchanges = self.exchanges.lock();
        exchanges.push_back(exchange);
        while exchanges.len() > MAX_EXCHANGES {
            exchanges.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<Exchange> {
        self.exchanges.lock().iter().cloned().collect()
    }

    /// Exchanges recorded for one conversation, oldest first
    pub fn for_conversation(&self, conversation_id: &str) -> Vec<Exchange> {
        self.exchanges
            .lock()
            .iter()
            .filter(|e| e.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect()
    }

    pub fn forget_conversation(&self, conversation_id: &str) {
        self.exchanges
            .lock()
            .retain(|e| e.conversation_id.as_deref() != Some(conversation_id));
    }

    pub fn len(&self) -> usize {
        self.exchanges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.lock().is_empty()
    }

    pub fn clear(&self) {
        self.exchanges.lock().clear();
    }
}

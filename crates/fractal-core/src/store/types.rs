//! Persisted conversation shapes

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::Exchange;
use crate::types::ChatMessage;

/// A stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }
}

/// List entry for the conversation picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub label: String,
}

impl ConversationMetadata {
    pub fn for_conversation(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            created_at: conversation.created_at,
            label: conversation_label(&conversation.created_at.with_timezone(&chrono::Local)),
        }
    }
}

/// "Jan 5, 3:07 PM"
pub fn conversation_label<Tz: TimeZone>(created_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    created_at.format("%b %-d, %-I:%M %p").to_string()
}

/// Webview state restored when the panel reopens.
///
/// Fields the host does not know about are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    #[serde(default)]
    pub current_conversation_id: Option<String>,
    #[serde(default)]
    pub input: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Export written by `saveTranscript`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub exchanges: Vec<Exchange>,
}

impl Transcript {
    pub fn new(conversation: Conversation, system_prompt: impl Into<String>, exchanges: Vec<Exchange>) -> Self {
        Self {
            conversation_id: conversation.id,
            created_at: conversation.created_at,
            saved_at: Utc::now(),
            system_prompt: system_prompt.into(),
            messages: conversation.messages,
            exchanges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_format() {
        let at = Utc.with_ymd_and_hms(2025, 1, 5, 15, 7, 0).unwrap();
        assert_eq!(conversation_label(&at), "Jan 5, 3:07 PM");
        let morning = Utc.with_ymd_and_hms(2025, 11, 20, 0, 30, 0).unwrap();
        assert_eq!(conversation_label(&morning), "Nov 20, 12:30 AM");
    }

    #[test]
    fn test_conversation_wire_shape() {
        let value = json!({
            "id": "abc",
            "createdAt": "2025-01-05T15:07:00.000Z",
            "messages": [{"role": "user", "content": "hi"}]
        });
        let conversation: Conversation = serde_json::from_value(value).unwrap();
        assert_eq!(conversation.messages.len(), 1);
        let back = serde_json::to_value(&conversation).unwrap();
        assert!(back.get("createdAt").is_some());
    }

    #[test]
    fn test_ui_state_keeps_unknown_fields() {
        let state: UiState =
            serde_json::from_value(json!({"currentConversationId": "c1", "input": "draft", "scroll": 42})).unwrap();
        assert_eq!(state.current_conversation_id.as_deref(), Some("c1"));
        assert_eq!(serde_json::to_value(&state).unwrap()["scroll"], 42);
    }
}

//! Model request and response types

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, ContentPart, MessageContent, MessageRole, Tool, ToolCall};

/// One non-streaming model call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl ModelRequest {
    /// Copy with timestamps and uninterpreted blocks stripped, ready for the wire
    pub fn for_wire(&self) -> Self {
        let messages = self
            .messages
            .iter()
            .map(|m| {
                let mut m = m.for_request();
                if let MessageContent::Parts(parts) = &mut m.content {
                    parts.retain(|p| !matches!(p, ContentPart::Unsupported));
                }
                m
            })
            .collect();
        Self {
            messages,
            ..self.clone()
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    EndTurn,
    /// The turn ends in tool invocations whose results are needed
    ToolUse,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::Other(s) => s,
        }
    }
}

impl From<String> for StopReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::Other(value),
        }
    }
}

impl From<StopReason> for String {
    fn from(value: StopReason) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// A complete model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: Vec<ContentPart>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub usage: Usage,
}

impl ModelResponse {
    /// Plain text response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            content: vec![ContentPart::text(text)],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }

    /// Response asking for tool output
    pub fn tool_use(content: Vec<ContentPart>) -> Self {
        Self {
            id: None,
            content,
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    pub fn needs_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
    }

    /// Tool invocations in block order
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolUse { id, name, input } => {
                    Some(ToolCall::new(id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// All text blocks, in order, joined with newlines
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The response as an assistant turn
    pub fn to_message(&self) -> ChatMessage {
        let parts = self
            .content
            .iter()
            .filter(|p| !matches!(p, ContentPart::Unsupported))
            .cloned()
            .collect();
        ChatMessage::with_parts(MessageRole::Assistant, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_api_response() {
        let response: ModelResponse = serde_json::from_value(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "thinking", "thinking": "...", "signature": "sig"},
                {"type": "text", "text": "Let me look."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_file", "input": {"path": "a.js"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 30}
        }))
        .unwrap();

        assert!(response.needs_tools());
        assert_eq!(response.usage.output_tokens, 30);
        assert_eq!(response.joined_text(), "Let me look.");
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_arg_str("path"), Some("a.js"));
        assert_eq!(response.to_message().content, MessageContent::Parts(response.content[1..].to_vec()));
    }

    #[test]
    fn test_stop_reason_strings() {
        assert_eq!(StopReason::from("max_tokens".to_string()), StopReason::MaxTokens);
        assert_eq!(StopReason::from("pause_turn".to_string()), StopReason::Other("pause_turn".into()));
        assert_eq!(serde_json::to_value(StopReason::ToolUse).unwrap(), json!("tool_use"));
    }

    #[test]
    fn test_joined_text() {
        let response = ModelResponse {
            id: None,
            content: vec![ContentPart::text("one"), ContentPart::text("two")],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        };
        assert_eq!(response.joined_text(), "one\ntwo");
    }

    #[test]
    fn test_request_wire_shape() {
        let request = ModelRequest {
            model: "m".into(),
            max_tokens: 10,
            temperature: 0.0,
            system: "sys".into(),
            messages: vec![
                ChatMessage::user("hi"),
                ChatMessage::with_parts(MessageRole::Assistant, vec![ContentPart::Unsupported, ContentPart::text("yo")]),
            ],
            tools: vec![],
        };
        let wire = serde_json::to_value(request.for_wire()).unwrap();
        assert_eq!(wire["messages"][0], json!({"role": "user", "content": "hi"}));
        assert_eq!(wire["messages"][1]["content"], json!([{"type": "text", "text": "yo"}]));
        assert_eq!(wire["temperature"], 0.0);
        assert!(wire.get("tools").is_none());
    }
}

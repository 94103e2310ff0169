//! Wire messages exchanged between the UI and the host
//!
//! Every message is a JSON object tagged by `type`:
//!
//! | type | direction | |
//! |---|---|---|
//! | `rpc-request` | UI → host | `{id, method, args}` |
//! | `rpc-response` | host → UI | `{id, result}` or `{id, error}` |
//! | `terminal-event` | UI → host | shell lifecycle notification |
//! | `editor-state` | UI → host | editor/terminal state notification |
//! | `show-context` | UI → host | asks for a `context-snapshot` |
//! | `context-snapshot` | host → UI | debug dump of the gathered context |

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::context::EditorStateUpdate;
use crate::store::UiState;
use super::error::{RpcError, RpcResult};

/// Any message on the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    RpcRequest(RpcRequestEnvelope),
    RpcResponse(RpcResponseEnvelope),
    TerminalEvent(TerminalEvent),
    EditorState(EditorStateUpdate),
    ShowContext,
    ContextSnapshot { snapshot: Value },
}

impl Envelope {
    /// Decode one inbound message.
    ///
    /// A malformed `rpc-request` that still carries a string id is returned as
    /// `Err(Some(id))` so the caller can answer it; anything else is `Err(None)`.
    pub fn decode(value: Value) -> Result<Self, (Option<String>, String)> {
        let recovered = recover_request_id(&value);
        serde_json::from_value(value).map_err(|e| (recovered, e.to_string()))
    }
}

/// Id of something that looks like a request, even if it does not decode
pub fn recover_request_id(value: &Value) -> Option<String> {
    if value.get("type").and_then(Value::as_str) != Some("rpc-request") {
        return None;
    }
    value.get("id").and_then(Value::as_str).map(str::to_string)
}

/// A call as it travels on the channel; `method` is not validated yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequestEnvelope {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl RpcRequestEnvelope {
    pub fn new(id: impl Into<String>, request: &RpcRequest) -> RpcResult<Self> {
        let (method, args) = request.to_parts()?;
        Ok(Self {
            id: id.into(),
            method,
            args,
        })
    }

    /// Validate the method and decode its arguments
    pub fn request(&self) -> RpcResult<RpcRequest> {
        RpcRequest::decode(&self.method, self.args.clone())
    }
}

/// Exactly one per request; `result` and `error` are never both set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponseEnvelope {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponseEnvelope {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> RpcResult<Value> {
        match self.error {
            Some(message) => Err(RpcError::Remote(message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// The fixed procedure set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "camelCase")]
pub enum RpcRequest {
    CreateConversation {},
    ListConversations {},
    LoadConversation {
        id: String,
    },
    DeleteConversation {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        conversation_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    SaveTranscript {
        conversation_id: String,
    },
    #[serde(rename = "saveUIState")]
    SaveUiState {
        state: UiState,
    },
    #[serde(rename = "loadUIState")]
    LoadUiState {},
}

impl RpcRequest {
    pub fn method(&self) -> &'static str {
        match self {
            RpcRequest::CreateConversation {} => "createConversation",
            RpcRequest::ListConversations {} => "listConversations",
            RpcRequest::LoadConversation { .. } => "loadConversation",
            RpcRequest::DeleteConversation { .. } => "deleteConversation",
            RpcRequest::SendMessage { .. } => "sendMessage",
            RpcRequest::SaveTranscript { .. } => "saveTranscript",
            RpcRequest::SaveUiState { .. } => "saveUIState",
            RpcRequest::LoadUiState {} => "loadUIState",
        }
    }

    /// Decode `args` for `method`. Missing args count as `{}`.
    ///
    /// The method tag is resolved by the enum's own deserializer; a tag it
    /// does not know is `UnknownMethod`, any other failure is bad arguments.
    pub fn decode(method: &str, args: Value) -> RpcResult<Self> {
        let args = if args.is_null() { Value::Object(Map::new()) } else { args };
        serde_json::from_value(json!({ "method": method, "args": args })).map_err(|e| {
            if e.to_string().starts_with(&format!("unknown variant `{}`", method)) {
                RpcError::UnknownMethod(method.to_string())
            } else {
                RpcError::InvalidArguments {
                    method: method.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    /// `(method, args)` as sent on the wire
    pub fn to_parts(&self) -> RpcResult<(String, Value)> {
        let mut value = serde_json::to_value(self)?;
        let args = value
            .get_mut("args")
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok((self.method().to_string(), args))
    }
}

/// Shell lifecycle notification.
///
/// `executionId` is chosen by the sender when a command starts and used to
/// route its output chunks; the end event pairs by command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TerminalEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        execution_id: String,
        command_line: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Output { execution_id: String, data: String },
    #[serde(rename_all = "camelCase")]
    Ended {
        command_line: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
    Integration { available: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = RpcRequest::SendMessage {
            conversation_id: "c1".into(),
            message: "hi".into(),
        };
        let envelope = Envelope::RpcRequest(RpcRequestEnvelope::new("rpc-0", &request).unwrap());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "type": "rpc-request",
                "id": "rpc-0",
                "method": "sendMessage",
                "args": {"conversationId": "c1", "message": "hi"}
            })
        );
    }

    fn every_request() -> Vec<RpcRequest> {
        vec![
            RpcRequest::CreateConversation {},
            RpcRequest::ListConversations {},
            RpcRequest::LoadConversation { id: "x".into() },
            RpcRequest::DeleteConversation { id: "x".into() },
            RpcRequest::SendMessage {
                conversation_id: "x".into(),
                message: "m".into(),
            },
            RpcRequest::SaveTranscript {
                conversation_id: "x".into(),
            },
            RpcRequest::SaveUiState {
                state: UiState::default(),
            },
            RpcRequest::LoadUiState {},
        ]
    }

    #[test]
    fn test_decode_all_methods() {
        for request in every_request() {
            let (method, args) = request.to_parts().unwrap();
            assert_eq!(method, request.method());
            assert_eq!(serde_json::to_value(&request).unwrap()["method"], method.as_str());
            assert_eq!(RpcRequest::decode(&method, args).unwrap(), request);
        }
        assert_eq!(
            RpcRequest::decode("listConversations", Value::Null).unwrap(),
            RpcRequest::ListConversations {}
        );
    }

    #[test]
    fn test_decode_failures() {
        let err = RpcRequest::decode("dropDatabase", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown method: dropDatabase");

        let err = RpcRequest::decode("loadConversation", json!({"id": 7})).unwrap_err();
        assert!(err.to_string().starts_with("Invalid arguments for loadConversation:"));

        // a known method with args of the wrong shape is not an unknown method
        let err = RpcRequest::decode("saveUIState", json!("nope")).unwrap_err();
        assert!(matches!(err, RpcError::InvalidArguments { .. }));

        let err = RpcRequest::decode("loadUiState", json!({})).unwrap_err();
        assert!(matches!(err, RpcError::UnknownMethod(_)));
    }

    #[test]
    fn test_notifications() {
        let started: Envelope = serde_json::from_value(json!({
            "type": "terminal-event",
            "event": "started",
            "executionId": "t1",
            "commandLine": "npm test",
            "cwd": "/w"
        }))
        .unwrap();
        assert!(matches!(started, Envelope::TerminalEvent(TerminalEvent::Started { .. })));

        let show: Envelope = serde_json::from_value(json!({"type": "show-context"})).unwrap();
        assert_eq!(show, Envelope::ShowContext);

        let state: Envelope =
            serde_json::from_value(json!({"type": "editor-state", "terminalCount": 2})).unwrap();
        match state {
            Envelope::EditorState(update) => assert_eq!(update.terminal_count, Some(2)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_recover_id_from_malformed_request() {
        let (id, _) = Envelope::decode(json!({"type": "rpc-request", "id": "rpc-9"})).unwrap_err();
        assert_eq!(id.as_deref(), Some("rpc-9"));
        let (id, _) = Envelope::decode(json!({"type": "mystery"})).unwrap_err();
        assert_eq!(id, None);
    }

    #[test]
    fn test_response_result() {
        assert_eq!(RpcResponseEnvelope::ok("1", json!("x")).into_result().unwrap(), json!("x"));
        let missing: RpcResponseEnvelope = serde_json::from_value(json!({"id": "1"})).unwrap();
        assert_eq!(missing.into_result().unwrap(), Value::Null);
        let err = RpcResponseEnvelope::err("1", "Conversation not found").into_result().unwrap_err();
        assert_eq!(err.to_string(), "Conversation not found");
    }
}

//! Tool executor trait

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{Tool, ToolCall};

/// Success payload or human-readable failure
pub type ToolOutcome = Result<Value, String>;

/// A locally executed, model-invokable function
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Name, description and input schema advertised to the model
    fn definition(&self) -> Tool;

    /// Run the tool. Failures are returned, never raised; the registry wraps
    /// the outcome into a `ToolResult`.
    async fn execute(&self, call: &ToolCall) -> ToolOutcome;
}

/// Fetch a required, non-empty string argument
pub(crate) fn require_str<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, String> {
    match call.get_arg_str(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("Missing required argument: {}", key)),
    }
}

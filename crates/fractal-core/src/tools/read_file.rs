//! `read_file`: full text of one workspace file

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::context::EditorEnvironment;
use crate::types::{Tool, ToolCall};
use super::traits::{require_str, ToolExecutor, ToolOutcome};

pub struct ReadFileTool {
    environment: Arc<dyn EditorEnvironment>,
}

impl ReadFileTool {
    pub fn new(environment: Arc<dyn EditorEnvironment>) -> Self {
        Self { environment }
    }
}

#[async_trait]
impl ToolExecutor for ReadFileTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "read_file",
            "Read the contents of a file in the workspace. Use this to examine code, configuration files, or any text file the student is working with.",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to workspace root (e.g., \"src/index.ts\" or \"package.json\")"
                }
            },
            "required": ["path"]
        }))
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let root = self
            .environment
            .workspace_root()
            .ok_or_else(|| "No workspace folder open".to_string())?;
        let requested = require_str(call, "path")?;

        let path = Path::new(requested);
        let absolute = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };

        let bytes = tokio::fs::read(&absolute)
            .await
            .map_err(|e| format!("Failed to read file: {}", e))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let lines = content.split('\n').count();

        Ok(json!({
            "path": requested,
            "content": content,
            "lines": lines,
        }))
    }
}

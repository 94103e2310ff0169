//! `get_editor_state`: active file, cursor and open tabs

use async_trait::async_trait;
use serde_json::json;

use crate::context::ContextGatherer;
use crate::types::{Tool, ToolCall};
use super::traits::{ToolExecutor, ToolOutcome};

pub struct EditorStateTool {
    gatherer: ContextGatherer,
}

impl EditorStateTool {
    pub fn new(gatherer: ContextGatherer) -> Self {
        Self { gatherer }
    }
}

#[async_trait]
impl ToolExecutor for EditorStateTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "get_editor_state",
            "Get the current state of the editor: which file is active, cursor position, open tabs. Use this to understand what the student is currently looking at.",
        )
    }

    async fn execute(&self, _call: &ToolCall) -> ToolOutcome {
        let editor = self.gatherer.editor_context();
        let active_file = editor.active_file.map(|file| {
            json!({
                "path": file.path,
                "language": file.language,
                "cursor": file.cursor_position,
                "selection": file.selection,
                "visibleRange": file.visible_range,
            })
        });

        Ok(json!({
            "activeFile": active_file,
            "openTabsCount": editor.open_tabs.len(),
            "openTabs": editor.open_tabs,
        }))
    }
}

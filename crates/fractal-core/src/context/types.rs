//! Point-in-time views of editor, workspace and terminal state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::terminal::CommandExecution;

/// 1-based cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

/// 1-based inclusive line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFile {
    /// Workspace-relative path
    pub path: String,
    pub language: String,
    pub cursor_position: CursorPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_range: Option<LineRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTab {
    pub path: String,
    #[serde(default)]
    pub is_dirty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_file: Option<ActiveFile>,
    #[serde(default)]
    pub open_tabs: Vec<OpenTab>,
}

/// A text document the editor has loaded (not necessarily visible)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDocument {
    pub path: String,
    #[serde(default)]
    pub is_dirty: bool,
    #[serde(default)]
    pub is_untitled: bool,
    /// Editor document version; a rough proxy for the number of edits
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsavedChange {
    pub path: String,
    pub change_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    /// Open, titled documents; there is no true "recent files" source
    pub recent_files: Vec<String>,
    pub unsaved_changes: Vec<UnsavedChange>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalContext {
    pub has_active_terminal: bool,
    pub terminal_count: usize,
    pub shell_integration_available: bool,
    pub running_commands: Vec<CommandExecution>,
    pub recent_executions: Vec<CommandExecution>,
    pub limitations: Vec<String>,
}

/// Everything the gatherer can see at one instant
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub editor: EditorContext,
    pub workspace: WorkspaceContext,
    pub terminal: TerminalContext,
    pub timestamp: DateTime<Utc>,
}

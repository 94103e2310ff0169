//! Access to the editor the host is attached to

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::types::{EditorContext, OpenDocument};

/// Read-only queries against the hosting editor
pub trait EditorEnvironment: Send + Sync {
    /// The single workspace root, if a folder is open
    fn workspace_root(&self) -> Option<PathBuf>;

    /// Active file, cursor and open tabs
    fn editor_context(&self) -> EditorContext;

    /// Documents currently loaded by the editor
    fn open_documents(&self) -> Vec<OpenDocument>;

    fn terminal_count(&self) -> usize;

    fn has_active_terminal(&self) -> bool;
}

/// Editor state pushed by the UI side (`editor-state` notification).
///
/// Absent fields leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<OpenDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_active_terminal: Option<bool>,
}

#[derive(Debug, Default)]
struct EnvironmentState {
    editor: EditorContext,
    documents: Vec<OpenDocument>,
    terminal_count: usize,
    has_active_terminal: bool,
}

/// Environment whose state is set explicitly: by notifications in the host,
/// directly in tests.
#[derive(Debug, Default)]
pub struct StaticEnvironment {
    root: Option<PathBuf>,
    state: RwLock<EnvironmentState>,
}

impl StaticEnvironment {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            state: RwLock::new(EnvironmentState::default()),
        }
    }

    /// No folder open
    pub fn without_workspace() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn set_editor(&self, editor: EditorContext) {
        self.state.write().editor = editor;
    }

    pub fn set_documents(&self, documents: Vec<OpenDocument>) {
        self.state.write().documents = documents;
    }

    pub fn set_terminals(&self, count: usize, has_active: bool) {
        let mut state = self.state.write();
        state.terminal_count = count;
        state.has_active_terminal = has_active;
    }

    pub fn apply(&self, update: EditorStateUpdate) {
        let mut state = self.state.write();
        if let Some(editor) = update.editor {
            state.editor = editor;
        }
        if let Some(documents) = update.documents {
            state.documents = documents;
        }
        if let Some(count) = update.terminal_count {
            state.terminal_count = count;
        }
        if let Some(active) = update.has_active_terminal {
            state.has_active_terminal = active;
        }
    }
}

impl EditorEnvironment for StaticEnvironment {
    fn workspace_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }

    fn editor_context(&self) -> EditorContext {
        self.state.read().editor.clone()
    }

    fn open_documents(&self) -> Vec<OpenDocument> {
        self.state.read().documents.clone()
    }

    fn terminal_count(&self) -> usize {
        self.state.read().terminal_count
    }

    fn has_active_terminal(&self) -> bool {
        self.state.read().has_active_terminal
    }
}

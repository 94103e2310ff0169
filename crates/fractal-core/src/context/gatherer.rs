//! Assembles context snapshots from the environment and terminal tracker

use std::path::PathBuf;
use std::sync::Arc;

use crate::terminal::TerminalTracker;
use super::environment::EditorEnvironment;
use super::types::{ContextSnapshot, EditorContext, TerminalContext, UnsavedChange, WorkspaceContext};

pub const NO_SHELL_INTEGRATION_NOTES: [&str; 3] = [
    "Shell Integration not detected - terminal output unavailable",
    "Enable shell integration in your shell (zsh/bash/fish/pwsh)",
    "See: https://code.visualstudio.com/docs/terminal/shell-integration",
];

pub const SHELL_INTEGRATION_NOTES: [&str; 2] = [
    "Only commands run after extension activation are captured",
    "Historical scrollback from before activation is not available",
];

/// Builds editor, workspace and terminal views on demand.
///
/// Holds no state of its own; the tracker and environment are injected.
#[derive(Clone)]
pub struct ContextGatherer {
    environment: Arc<dyn EditorEnvironment>,
    tracker: Arc<TerminalTracker>,
}

impl ContextGatherer {
    pub fn new(environment: Arc<dyn EditorEnvironment>, tracker: Arc<TerminalTracker>) -> Self {
        Self {
            environment,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<TerminalTracker> {
        &self.tracker
    }

    pub fn environment(&self) -> Arc<dyn EditorEnvironment> {
        self.environment.clone()
    }

    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.environment.workspace_root()
    }

    pub fn editor_context(&self) -> EditorContext {
        self.environment.editor_context()
    }

    pub fn workspace_context(&self) -> WorkspaceContext {
        let documents = self.environment.open_documents();
        WorkspaceContext {
            root_path: self
                .environment
                .workspace_root()
                .map(|p| p.to_string_lossy().into_owned()),
            recent_files: documents
                .iter()
                .filter(|d| !d.is_untitled)
                .map(|d| d.path.clone())
                .collect(),
            unsaved_changes: documents
                .iter()
                .filter(|d| d.is_dirty && !d.is_untitled)
                .map(|d| UnsavedChange {
                    path: d.path.clone(),
                    change_count: d.version,
                })
                .collect(),
        }
    }

    pub fn terminal_context(&self) -> TerminalContext {
        let available = self.tracker.shell_integration_available();
        let limitations = if available {
            SHELL_INTEGRATION_NOTES.iter().map(|s| s.to_string()).collect()
        } else {
            NO_SHELL_INTEGRATION_NOTES.iter().map(|s| s.to_string()).collect()
        };

        TerminalContext {
            has_active_terminal: self.environment.has_active_terminal(),
            terminal_count: self.environment.terminal_count(),
            shell_integration_available: available,
            running_commands: self.tracker.running(),
            recent_executions: self.tracker.recent(),
            limitations,
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            editor: self.editor_context(),
            workspace: self.workspace_context(),
            terminal: self.terminal_context(),
            timestamp: self.tracker.now(),
        }
    }
}

impl std::fmt::Debug for ContextGatherer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGatherer")
            .field("workspace_root", &self.workspace_root())
            .field("tracker", &self.tracker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ActiveFile, CursorPosition, EditorStateUpdate, OpenDocument, OpenTab, StaticEnvironment};

    fn gatherer() -> (ContextGatherer, Arc<StaticEnvironment>, Arc<TerminalTracker>) {
        let env = Arc::new(StaticEnvironment::new("/work/project"));
        let tracker = Arc::new(TerminalTracker::new());
        (ContextGatherer::new(env.clone(), tracker.clone()), env, tracker)
    }

    #[test]
    fn test_workspace_context_from_documents() {
        let (gatherer, env, _) = gatherer();
        env.set_documents(vec![
            OpenDocument { path: "src/main.rs".into(), is_dirty: true, is_untitled: false, version: 7 },
            OpenDocument { path: "Untitled-1".into(), is_dirty: true, is_untitled: true, version: 2 },
            OpenDocument { path: "README.md".into(), is_dirty: false, is_untitled: false, version: 1 },
        ]);

        let workspace = gatherer.workspace_context();
        assert_eq!(workspace.root_path.as_deref(), Some("/work/project"));
        assert_eq!(workspace.recent_files, vec!["src/main.rs", "README.md"]);
        assert_eq!(
            workspace.unsaved_changes,
            vec![UnsavedChange { path: "src/main.rs".into(), change_count: 7 }]
        );
    }

    #[test]
    fn test_terminal_limitations_follow_integration() {
        let (gatherer, env, tracker) = gatherer();
        env.set_terminals(2, true);

        let without = gatherer.terminal_context();
        assert!(!without.shell_integration_available);
        assert_eq!(without.limitations.len(), 3);
        assert_eq!(without.terminal_count, 2);

        tracker.set_shell_integration(true);
        tracker.command_started("npm run dev", None);
        let with = gatherer.terminal_context();
        assert_eq!(with.limitations, SHELL_INTEGRATION_NOTES.map(String::from).to_vec());
        assert_eq!(with.running_commands.len(), 1);
    }

    #[test]
    fn test_snapshot_serializes_editor_update() {
        let (gatherer, env, _) = gatherer();
        env.apply(EditorStateUpdate {
            editor: Some(EditorContext {
                active_file: Some(ActiveFile {
                    path: "src/lib.rs".into(),
                    language: "rust".into(),
                    cursor_position: CursorPosition { line: 3, column: 5 },
                    selection: None,
                    visible_range: None,
                }),
                open_tabs: vec![OpenTab { path: "src/lib.rs".into(), is_dirty: false }],
            }),
            ..Default::default()
        });

        let json = serde_json::to_value(gatherer.snapshot()).unwrap();
        assert_eq!(json["editor"]["activeFile"]["cursorPosition"]["line"], 3);
        assert_eq!(json["editor"]["openTabs"][0]["isDirty"], false);
        assert_eq!(json["terminal"]["shellIntegrationAvailable"], false);
        assert!(json["timestamp"].is_string());
    }
}

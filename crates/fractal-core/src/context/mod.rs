//! Editor, workspace and terminal context

mod types;
mod environment;
mod gatherer;

pub use types::{
    ActiveFile, ContextSnapshot, CursorPosition, EditorContext, LineRange, OpenDocument, OpenTab,
    TerminalContext, UnsavedChange, WorkspaceContext,
};
pub use environment::{EditorEnvironment, EditorStateUpdate, StaticEnvironment};
pub use gatherer::{ContextGatherer, NO_SHELL_INTEGRATION_NOTES, SHELL_INTEGRATION_NOTES};

//! Model-invokable workspace tools
//!
//! ```text
//! Orchestrator ──ToolCall──▶ ToolRegistry ──▶ ToolExecutor
//!      ▲                         │              ├─ read_file
//!      └────────ToolResult───────┘              ├─ search_project
//!                                               ├─ get_terminal_output ─┐
//!                                               └─ get_editor_state ────┴─▶ ContextGatherer
//! ```

mod traits;
mod registry;
mod read_file;
mod search;
mod terminal_output;
mod editor_state;

pub use traits::{ToolExecutor, ToolOutcome};
pub use registry::ToolRegistry;
pub use read_file::ReadFileTool;
pub use search::{
    search_workspace, SearchMatch, SearchOutput, SearchProjectTool, DEFAULT_MAX_RESULTS,
    EXCLUDED_DIRS, MAX_FILES_SCANNED,
};
pub use terminal_output::{
    ExecutionSummary, RunningSummary, TerminalOutputTool, DEFAULT_MAX_EXECUTIONS, DEFAULT_MAX_LINES,
};
pub use editor_state::EditorStateTool;

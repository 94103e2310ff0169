//! Terminal activity: output sanitizing, capture buffers and the execution tracker

mod sanitize;
mod buffer;
mod tracker;

pub use sanitize::{output_preview, sanitize, truncate_output, TAIL_ELLIPSIS};
pub use buffer::OutputBuffer;
pub use tracker::{
    Clock, CommandExecution, ExecutionId, ExecutionStatus, ManualClock, SystemClock,
    TerminalTracker, MAX_RECENT_EXECUTIONS,
};

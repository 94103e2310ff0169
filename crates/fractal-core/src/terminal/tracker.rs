//! Terminal activity tracker
//!
//! Each command execution moves `Running -> Completed` exactly once. Running
//! records are kept in start order; completed ones move into a bounded
//! recent history (oldest evicted first).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::{log_debug, log_info};
use super::buffer::OutputBuffer;

/// Capacity of the completed-execution history
pub const MAX_RECENT_EXECUTIONS: usize = 20;

/// Source of timestamps for execution records
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Identifier for one execution: command text plus start time plus a
/// sequence number, so repeated identical commands stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    fn new(command_line: &str, started: DateTime<Utc>, seq: u64) -> Self {
        Self(format!("{}-{}-{}", command_line, started.timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
}

/// One shell command execution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecution {
    #[serde(skip)]
    pub id: ExecutionId,
    pub command_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub output: OutputBuffer,
}

impl CommandExecution {
    /// Wall time between start and end, for completed executions
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Whole seconds since start as of `now`
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }
}

#[derive(Default)]
struct TrackerState {
    running: Vec<CommandExecution>,
    recent: VecDeque<CommandExecution>,
}

/// Owned state container for terminal activity.
///
/// Mutated only by the event methods (`command_started`, `output_received`,
/// `command_ended`); read through snapshots by the context gatherer and tools.
pub struct TerminalTracker {
    state: RwLock<TrackerState>,
    shell_integration: std::sync::atomic::AtomicBool,
    seq: AtomicU64,
    clock: Arc<dyn Clock>,
    logger: SharedLogger,
}

impl Default for TerminalTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            shell_integration: std::sync::atomic::AtomicBool::new(false),
            seq: AtomicU64::new(0),
            clock: Arc::new(SystemClock),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record whether command lifecycle events can be observed at all
    pub fn set_shell_integration(&self, available: bool) {
        let was = self.shell_integration.swap(available, Ordering::SeqCst);
        if was != available {
            log_info!(self.logger, "[terminal] Shell integration available: {}", available);
        }
    }

    pub fn shell_integration_available(&self) -> bool {
        self.shell_integration.load(Ordering::SeqCst)
    }

    /// A command started; returns the id its output chunks are reported under
    pub fn command_started(&self, command_line: impl Into<String>, cwd: Option<String>) -> ExecutionId {
        let command_line = command_line.into();
        let start_time = self.clock.now();
        let id = ExecutionId::new(&command_line, start_time, self.seq.fetch_add(1, Ordering::SeqCst));

        log_debug!(self.logger, "[terminal] Command started: {}", command_line);
        self.state.write().running.push(CommandExecution {
            id: id.clone(),
            command_line,
            cwd,
            status: ExecutionStatus::Running,
            start_time,
            end_time: None,
            exit_code: None,
            output: OutputBuffer::new(),
        });
        id
    }

    /// Append a chunk of output.
    ///
    /// A chunk for an execution that already completed goes to its record in
    /// the recent history; if it has been evicted the chunk is dropped.
    /// Returns whether the chunk was stored.
    pub fn output_received(&self, id: &ExecutionId, chunk: &str) -> bool {
        let mut state = self.state.write();
        let TrackerState { running, recent } = &mut *state;
        let record = running
            .iter_mut()
            .find(|e| &e.id == id)
            .or_else(|| recent.iter_mut().find(|e| &e.id == id));

        match record {
            Some(execution) => {
                execution.output.append(chunk);
                true
            }
            None => {
                log_debug!(self.logger, "[terminal] Dropping output for unknown execution {}", id);
                false
            }
        }
    }

    /// A command ended.
    ///
    /// Pairs with the first running record (in start order) whose command
    /// line matches. With no match the event is dropped and `None` returned.
    pub fn command_ended(&self, command_line: &str, exit_code: Option<i32>) -> Option<ExecutionId> {
        let mut state = self.state.write();
        let Some(index) = state.running.iter().position(|e| e.command_line == command_line) else {
            log_debug!(self.logger, "[terminal] End event with no running match: {}", command_line);
            return None;
        };

        let mut execution = state.running.remove(index);
        execution.status = ExecutionStatus::Completed;
        execution.exit_code = exit_code;
        execution.end_time = Some(self.clock.now());
        let id = execution.id.clone();

        log_debug!(
            self.logger,
            "[terminal] Command completed: {} (exit: {:?}, {} bytes)",
            command_line,
            exit_code,
            execution.output.len()
        );

        state.recent.push_back(execution);
        while state.recent.len() > MAX_RECENT_EXECUTIONS {
            state.recent.pop_front();
        }
        Some(id)
    }

    /// Running executions in start order
    pub fn running(&self) -> Vec<CommandExecution> {
        self.state.read().running.clone()
    }

    /// Completed executions, oldest first
    pub fn recent(&self) -> Vec<CommandExecution> {
        self.state.read().recent.iter().cloned().collect()
    }

    /// The `n` most recently completed executions, oldest first
    pub fn latest(&self, n: usize) -> Vec<CommandExecution> {
        let state = self.state.read();
        let skip = state.recent.len().saturating_sub(n);
        state.recent.iter().skip(skip).cloned().collect()
    }

    pub fn running_count(&self) -> usize {
        self.state.read().running.len()
    }
}

impl std::fmt::Debug for TerminalTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("TerminalTracker")
            .field("running", &state.running.len())
            .field("recent", &state.recent.len())
            .field("shell_integration", &self.shell_integration_available())
            .finish()
    }
}

//! `get_terminal_output`: recent and running shell commands

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::context::ContextGatherer;
use crate::terminal::{output_preview, CommandExecution, ExecutionStatus};
use crate::types::{Tool, ToolCall};
use super::traits::{ToolExecutor, ToolOutcome};

pub const DEFAULT_MAX_EXECUTIONS: usize = 5;
pub const DEFAULT_MAX_LINES: usize = 50;
/// Preview budget per output line
const CHARS_PER_LINE: usize = 80;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub status: ExecutionStatus,
    /// Seconds with two decimals, e.g. `"1.50s"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub output: String,
    pub output_truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningSummary {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub elapsed_seconds: i64,
}

pub struct TerminalOutputTool {
    gatherer: ContextGatherer,
}

impl TerminalOutputTool {
    pub fn new(gatherer: ContextGatherer) -> Self {
        Self { gatherer }
    }

    fn summarize(execution: &CommandExecution, max_lines: usize) -> ExecutionSummary {
        let raw = execution.output.as_str();
        let preview = output_preview(raw, false, max_lines.saturating_mul(CHARS_PER_LINE));
        let output = preview.split('\n').take(max_lines).collect::<Vec<_>>().join("\n");

        ExecutionSummary {
            command: execution.command_line.clone(),
            cwd: execution.cwd.clone(),
            exit_code: execution.exit_code,
            status: execution.status,
            duration: execution
                .duration()
                .map(|d| format!("{:.2}s", d.num_milliseconds() as f64 / 1000.0)),
            output,
            output_truncated: raw.split('\n').count() > max_lines,
        }
    }
}

#[async_trait]
impl ToolExecutor for TerminalOutputTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "get_terminal_output",
            "Get the output from recent terminal commands. Use this to see errors, test results, build output, or any other terminal activity.",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "max_executions": {
                    "type": "number",
                    "description": "Number of recent command executions to retrieve (default: 5)"
                },
                "max_lines_per_execution": {
                    "type": "number",
                    "description": "Maximum lines of output per command (default: 50)"
                }
            },
            "required": []
        }))
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let max_executions = call.get_arg_count("max_executions").unwrap_or(DEFAULT_MAX_EXECUTIONS);
        let max_lines = call
            .get_arg_count("max_lines_per_execution")
            .unwrap_or(DEFAULT_MAX_LINES);

        let context = self.gatherer.terminal_context();
        if !context.shell_integration_available {
            return Ok(json!({
                "shellIntegrationAvailable": false,
                "executions": [],
                "runningCommands": [],
                "limitations": context.limitations,
            }));
        }

        let tracker = self.gatherer.tracker();
        let now = tracker.now();
        let executions: Vec<ExecutionSummary> = tracker
            .latest(max_executions)
            .iter()
            .map(|e| Self::summarize(e, max_lines))
            .collect();
        let running: Vec<RunningSummary> = context
            .running_commands
            .iter()
            .map(|e| RunningSummary {
                command: e.command_line.clone(),
                cwd: e.cwd.clone(),
                elapsed_seconds: e.elapsed_seconds(now),
            })
            .collect();

        Ok(json!({
            "shellIntegrationAvailable": true,
            "executions": executions,
            "runningCommands": running,
            "limitations": context.limitations,
        }))
    }
}

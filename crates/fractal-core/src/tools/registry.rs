//! Tool registry: schemas for the model, dispatch for tool calls
//!
//! The registry is the only way tool code is reached. Whatever happens
//! inside an executor (error, unknown name, panic) comes back as a
//! `ToolResult`, never as a Rust error.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;

use crate::context::ContextGatherer;
use crate::logging::Logger;
use crate::types::{Tool, ToolCall, ToolResult};
use crate::{log_debug, log_warn};
use super::editor_state::EditorStateTool;
use super::read_file::ReadFileTool;
use super::search::SearchProjectTool;
use super::terminal_output::TerminalOutputTool;
use super::traits::ToolExecutor;

/// Registered tools, in registration order
pub struct ToolRegistry {
    executors: RwLock<Vec<Arc<dyn ToolExecutor>>>,
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            executors: RwLock::new(Vec::new()),
            logger,
        }
    }

    /// Registry with the four workspace tools:
    /// `read_file`, `search_project`, `get_terminal_output`, `get_editor_state`
    pub fn with_workspace_tools(gatherer: ContextGatherer, logger: Arc<dyn Logger>) -> Self {
        let registry = Self::new(logger);
        let environment = gatherer.environment();
        registry.register(Arc::new(ReadFileTool::new(environment.clone())));
        registry.register(Arc::new(SearchProjectTool::new(environment)));
        registry.register(Arc::new(TerminalOutputTool::new(gatherer.clone())));
        registry.register(Arc::new(EditorStateTool::new(gatherer)));
        registry
    }

    /// Add a tool; a tool with the same name is replaced
    pub fn register(&self, executor: Arc<dyn ToolExecutor>) {
        let name = executor.definition().name;
        let mut executors = self.executors.write();
        executors.retain(|e| e.definition().name != name);
        executors.push(executor);
    }

    /// Tool definitions sent to the model
    pub fn definitions(&self) -> Vec<Tool> {
        self.executors.read().iter().map(|e| e.definition()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.executors.read().len()
    }

    fn find(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.executors
            .read()
            .iter()
            .find(|e| e.definition().name == name)
            .cloned()
    }

    /// Execute one tool call
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(executor) = self.find(&call.name) else {
            log_warn!(self.logger, "[ToolRegistry] Unknown tool: {}", call.name);
            return ToolResult::err(format!("Unknown tool: {}", call.name));
        };

        log_debug!(self.logger, "[ToolRegistry] Executing {} ({})", call.name, call.id);
        let result = match AssertUnwindSafe(executor.execute(call)).catch_unwind().await {
            Ok(Ok(data)) => ToolResult::ok(data),
            Ok(Err(message)) => ToolResult::err(message),
            Err(_) => ToolResult::err(format!("Tool {} failed unexpectedly", call.name)),
        };
        log_debug!(
            self.logger,
            "[ToolRegistry] {} finished (success: {})",
            call.name,
            result.success
        );
        result
    }

    /// Execute independent tool calls concurrently.
    ///
    /// Results are returned in the same order as `calls`.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        futures::future::join_all(calls.iter().map(|call| self.execute(call))).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.definitions().into_iter().map(|t| t.name).collect();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticEnvironment;
    use crate::logging::NoOpLogger;
    use crate::terminal::TerminalTracker;
    use crate::tools::ToolOutcome;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Sleeps for `delay_ms` then echoes its input
    struct SlowEcho;

    #[async_trait]
    impl ToolExecutor for SlowEcho {
        fn definition(&self) -> Tool {
            Tool::new("slow_echo", "Echo after a delay")
        }

        async fn execute(&self, call: &ToolCall) -> ToolOutcome {
            let delay = call.input.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(call.input.clone())
        }
    }

    struct Panics;

    #[async_trait]
    impl ToolExecutor for Panics {
        fn definition(&self) -> Tool {
            Tool::new("panics", "Always panics")
        }

        async fn execute(&self, _call: &ToolCall) -> ToolOutcome {
            panic!("boom")
        }
    }

    fn workspace_registry() -> ToolRegistry {
        let gatherer = ContextGatherer::new(
            Arc::new(StaticEnvironment::new("/work")),
            Arc::new(TerminalTracker::new()),
        );
        ToolRegistry::with_workspace_tools(gatherer, Arc::new(NoOpLogger))
    }

    #[test]
    fn test_workspace_tool_schemas() {
        let registry = workspace_registry();
        let names: Vec<String> = registry.definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["read_file", "search_project", "get_terminal_output", "get_editor_state"]
        );
        for tool in registry.definitions() {
            assert_eq!(tool.input_schema["type"], "object");
            assert!(!tool.description.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = workspace_registry();
        let result = registry.execute(&ToolCall::new("t", "rm_rf", json!({}))).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown tool: rm_rf"));
    }

    #[tokio::test]
    async fn test_panicking_tool_becomes_error_result() {
        let registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry.register(Arc::new(Panics));
        let result = registry.execute(&ToolCall::new("t", "panics", json!({}))).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("panics"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_all_runs_concurrently_in_order() {
        let registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry.register(Arc::new(SlowEcho));
        let calls = vec![
            ToolCall::new("a", "slow_echo", json!({ "delay_ms": 300, "tag": "a" })),
            ToolCall::new("b", "slow_echo", json!({ "delay_ms": 100, "tag": "b" })),
            ToolCall::new("c", "slow_echo", json!({ "delay_ms": 200, "tag": "c" })),
        ];

        let started = tokio::time::Instant::now();
        let results = registry.execute_all(&calls).await;
        let elapsed = started.elapsed();

        let tags: Vec<&str> = results
            .iter()
            .map(|r| r.data.as_ref().unwrap()["tag"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert!(elapsed < Duration::from_millis(600), "ran sequentially: {:?}", elapsed);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry.register(Arc::new(SlowEcho));
        registry.register(Arc::new(SlowEcho));
        assert_eq!(registry.tool_count(), 1);
    }
}

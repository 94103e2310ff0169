//! Tool-use loop for one user turn
//!
//! ```text
//! history ──▶ model ──end_turn──▶ answer
//!               │ ▲
//!      tool_use │ │ tool results (one user turn)
//!               ▼ │
//!           ToolRegistry
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{load_system_prompt, TutorSettings, FALLBACK_SYSTEM_PROMPT};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::providers::{ModelClient, ModelRequest, ProviderError};
use crate::tools::ToolRegistry;
use crate::types::{CancellationToken, ChatMessage, ContentPart, MessageRole};
use crate::{log_debug, log_error, log_info};
use super::audit::AuditLog;
use super::error::{format_chat_error, ChatError, ChatResult};

/// A completed turn
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Final answer: every text block of the last response joined with "\n"
    pub text: String,
    /// Number of tool rounds executed
    pub tool_rounds: usize,
    /// Turns added after the input history (tool turns and the final answer)
    pub turns: Vec<ChatMessage>,
}

/// Drives the model until it produces a final answer
pub struct Orchestrator {
    model: Option<Arc<dyn ModelClient>>,
    registry: Arc<ToolRegistry>,
    settings: TutorSettings,
    system_prompt: RwLock<String>,
    workspace_root: Option<PathBuf>,
    audit: Arc<AuditLog>,
    logger: SharedLogger,
}

impl Orchestrator {
    /// `model` is `None` when no credential could be resolved; turns then
    /// answer with configuration guidance.
    pub fn new(model: Option<Arc<dyn ModelClient>>, registry: Arc<ToolRegistry>, settings: TutorSettings) -> Self {
        Self {
            model,
            registry,
            settings,
            system_prompt: RwLock::new(FALLBACK_SYSTEM_PROMPT.to_string()),
            workspace_root: None,
            audit: Arc::new(AuditLog::new()),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_system_prompt(self, prompt: impl Into<String>) -> Self {
        *self.system_prompt.write() = prompt.into();
        self
    }

    /// Root used by [`Orchestrator::reload_system_prompt`]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn system_prompt(&self) -> String {
        self.system_prompt.read().clone()
    }

    /// Re-read the system instructions from disk
    pub fn reload_system_prompt(&self) -> String {
        let prompt = match &self.workspace_root {
            Some(root) => load_system_prompt(
                root,
                self.settings.system_prompt_path.as_deref(),
                self.logger.as_ref(),
            ),
            None => FALLBACK_SYSTEM_PROMPT.to_string(),
        };
        *self.system_prompt.write() = prompt.clone();
        log_info!(self.logger, "[Orchestrator] System prompt reloaded ({} chars)", prompt.len());
        prompt
    }

    pub fn audit_log(&self) -> Arc<AuditLog> {
        self.audit.clone()
    }

    pub fn settings(&self) -> &TutorSettings {
        &self.settings
    }

    /// Answer the last user turn of `history`, or the user-facing error text
    pub async fn reply(&self, history: &[ChatMessage], cancel: &CancellationToken) -> String {
        match self.chat(history, cancel).await {
            Ok(outcome) => outcome.text,
            Err(e) => {
                log_error!(self.logger, "[Orchestrator] Turn failed: {}", e);
                format_chat_error(&e)
            }
        }
    }

    /// Run the tool-use loop.
    ///
    /// At most `max_tool_rounds` tool rounds run, so the model is called at
    /// most `max_tool_rounds + 1` times.
    pub async fn chat(&self, history: &[ChatMessage], cancel: &CancellationToken) -> ChatResult<ChatOutcome> {
        self.run(None, history, cancel).await
    }

    /// [`Orchestrator::chat`] with exchanges audited under `conversation_id`
    pub async fn chat_in(
        &self,
        conversation_id: &str,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> ChatResult<ChatOutcome> {
        self.run(Some(conversation_id), history, cancel).await
    }

    async fn run(
        &self,
        conversation_id: Option<&str>,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> ChatResult<ChatOutcome> {
        let model = self.model.clone().ok_or(ChatError::MissingCredentials)?;
        let tools = self.registry.definitions();
        let system = self.system_prompt();
        let mut messages = history.to_vec();
        let start = messages.len();
        let mut round = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ChatError::Cancelled);
            }

            let request = ModelRequest {
                model: self.settings.model.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                system: system.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
            };
            log_debug!(self.logger, "[Orchestrator] Round {}: {} messages", round, messages.len());

            let response = match model.create_message(request.clone(), cancel).await {
                Ok(response) => {
                    self.audit.record_response(conversation_id, round, request, response.clone());
                    response
                }
                Err(ProviderError::Cancelled) => {
                    self.audit.record_error(conversation_id, round, request, "cancelled");
                    return Err(ChatError::Cancelled);
                }
                Err(e) => {
                    self.audit.record_error(conversation_id, round, request, e.to_string());
                    return Err(e.into());
                }
            };

            let calls = response.tool_calls();
            log_info!(
                self.logger,
                "[Orchestrator] Round {}: stop reason {}, {} tool call(s)",
                round,
                response.stop_reason,
                calls.len()
            );

            // A tool_use stop with no invocation blocks has nothing to resubmit.
            if !response.needs_tools() || calls.is_empty() {
                let text = response.joined_text();
                messages.push(ChatMessage::assistant(text.clone()));
                return Ok(ChatOutcome {
                    text,
                    tool_rounds: round,
                    turns: messages.split_off(start),
                });
            }

            if round >= self.settings.max_tool_rounds {
                log_error!(
                    self.logger,
                    "[Orchestrator] Tool loop exceeded {} rounds",
                    self.settings.max_tool_rounds
                );
                return Err(ChatError::ToolLoopExceeded { rounds: round });
            }

            messages.push(response.to_message());
            let results = self.registry.execute_all(&calls).await;
            let parts = calls
                .iter()
                .zip(results)
                .map(|(call, result)| ContentPart::tool_result(&call.id, result.to_content(), !result.success))
                .collect();
            messages.push(ChatMessage::with_parts(MessageRole::User, parts));
            round += 1;
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .field("registry", &self.registry)
            .field("max_tool_rounds", &self.settings.max_tool_rounds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::CREDENTIALS_GUIDANCE;
    use crate::providers::ScriptedModel;
    use crate::tools::{ToolExecutor, ToolOutcome};
    use crate::types::{MessageContent, Tool, ToolCall};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        fn definition(&self) -> Tool {
            Tool::new("echo", "Echo the input")
        }

        async fn execute(&self, call: &ToolCall) -> ToolOutcome {
            let delay = call.input.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(call.input.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl ToolExecutor for Broken {
        fn definition(&self) -> Tool {
            Tool::new("read_file", "Always fails")
        }

        async fn execute(&self, _call: &ToolCall) -> ToolOutcome {
            Err("Failed to read file: not found".into())
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Broken));
        Arc::new(registry)
    }

    fn orchestrator(model: Arc<ScriptedModel>, rounds: usize) -> Orchestrator {
        let settings = TutorSettings {
            max_tool_rounds: rounds,
            ..TutorSettings::default()
        };
        Orchestrator::new(Some(model as Arc<dyn ModelClient>), registry(), settings).with_system_prompt("Be a tutor.")
    }

    fn tool_results(message: &ChatMessage) -> Vec<(String, String, bool)> {
        match &message.content {
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolResult { tool_use_id, content, is_error } => {
                        Some((tool_use_id.clone(), content.clone(), *is_error))
                    }
                    _ => None,
                })
                .collect(),
            MessageContent::Text(_) => vec![],
        }
    }

    #[tokio::test]
    async fn test_two_tool_rounds_then_answer() {
        let model = Arc::new(
            ScriptedModel::new()
                .then_tools(&[("toolu_1", "echo", json!({"n": 1}))])
                .then_tools(&[("toolu_2", "echo", json!({"n": 2}))])
                .then(crate::providers::ModelResponse {
                    content: vec![ContentPart::text("First."), ContentPart::text("Second.")],
                    ..crate::providers::ModelResponse::text("")
                }),
        );
        let orchestrator = orchestrator(model.clone(), 10);

        let outcome = orchestrator
            .chat(&[ChatMessage::user("help")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.tool_rounds, 2);
        assert_eq!(outcome.text, "First.\nSecond.");
        assert_eq!(model.call_count(), 3);
        // assistant tool turn + results, twice, then the answer
        assert_eq!(outcome.turns.len(), 5);

        let requests = model.requests();
        assert_eq!(requests[0].system, "Be a tutor.");
        assert_eq!(requests[0].tools.len(), 2);
        let last = requests[2].messages.last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        let results = tool_results(last);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "toolu_2");
        assert!(results[0].1.contains(r#""n":2"#));
        assert_eq!(orchestrator.audit_log().len(), 3);
    }

    #[tokio::test]
    async fn test_always_tool_use_hits_bound() {
        let model = Arc::new(ScriptedModel::always_tool_use("echo", json!({})));
        let orchestrator = orchestrator(model.clone(), 3);

        let err = orchestrator
            .chat(&[ChatMessage::user("loop")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::ToolLoopExceeded { rounds: 3 }));
        assert_eq!(model.call_count(), 4);
        let text = orchestrator.reply(&[ChatMessage::user("loop")], &CancellationToken::new()).await;
        assert!(text.contains("stopped after 3 tool rounds"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back() {
        let model = Arc::new(
            ScriptedModel::new()
                .then_tools(&[("toolu_1", "read_file", json!({"path": "missing.js"}))])
                .then_text("That file does not exist."),
        );
        let orchestrator = orchestrator(model.clone(), 10);

        let answer = orchestrator.reply(&[ChatMessage::user("read it")], &CancellationToken::new()).await;

        assert_eq!(answer, "That file does not exist.");
        let results = tool_results(model.requests()[1].messages.last().unwrap());
        assert!(results[0].2);
        assert!(results[0].1.contains("Failed to read file"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_tools_keep_invocation_order() {
        let model = Arc::new(
            ScriptedModel::new()
                .then_tools(&[
                    ("toolu_slow", "echo", json!({"delay_ms": 50})),
                    ("toolu_fast", "echo", json!({"delay_ms": 1})),
                    ("toolu_bad", "nope", json!({})),
                ])
                .then_text("ok"),
        );
        let orchestrator = orchestrator(model.clone(), 10);
        orchestrator.chat(&[ChatMessage::user("go")], &CancellationToken::new()).await.unwrap();

        let results = tool_results(model.requests()[1].messages.last().unwrap());
        let ids: Vec<_> = results.iter().map(|r| r.0.as_str()).collect();
        assert_eq!(ids, vec!["toolu_slow", "toolu_fast", "toolu_bad"]);
        assert!(results[2].2);
        assert!(results[2].1.contains("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn test_provider_error_is_terminal() {
        let model = Arc::new(
            ScriptedModel::new()
                .then_error(ProviderError::api(401, "invalid x-api-key"))
                .then_text("never"),
        );
        let orchestrator = orchestrator(model.clone(), 10);

        let answer = orchestrator.reply(&[ChatMessage::user("hi")], &CancellationToken::new()).await;

        assert!(answer.starts_with("❌ Invalid API key"));
        assert_eq!(model.call_count(), 1);
        assert_eq!(orchestrator.audit_log().snapshot()[0].error.as_deref(), Some("API error (401): invalid x-api-key"));
    }

    #[tokio::test]
    async fn test_missing_credentials_skips_model() {
        let orchestrator = Orchestrator::new(None, registry(), TutorSettings::default());
        let answer = orchestrator.reply(&[ChatMessage::user("hi")], &CancellationToken::new()).await;
        assert_eq!(answer, CREDENTIALS_GUIDANCE);
        assert!(orchestrator.audit_log().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_turn() {
        let model = Arc::new(ScriptedModel::new().then_text("unused"));
        let orchestrator = orchestrator(model.clone(), 10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator.chat(&[ChatMessage::user("hi")], &cancel).await.unwrap_err();
        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn test_reload_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".fractal")).unwrap();
        std::fs::write(dir.path().join(".fractal/system-prompt.md"), "Socratic only.").unwrap();

        let orchestrator = Orchestrator::new(None, registry(), TutorSettings::default())
            .with_workspace_root(dir.path());
        assert_eq!(orchestrator.system_prompt(), FALLBACK_SYSTEM_PROMPT);
        assert_eq!(orchestrator.reload_system_prompt(), "Socratic only.");
        assert_eq!(orchestrator.system_prompt(), "Socratic only.");
    }
}

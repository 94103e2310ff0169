//! One host session for one workspace
//!
//! `TutorSession` owns every stateful piece (tracker, environment, tools,
//! orchestrator, storage) and serves the bridge over a reader/writer pair.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::task::JoinHandle;

use crate::chat::Orchestrator;
use crate::config::{load_system_prompt, resolve_settings, TutorSettings};
use crate::context::{ContextGatherer, StaticEnvironment};
use crate::credentials::{CredentialChain, ANTHROPIC};
use crate::logging::SharedLogger;
use crate::providers::{AnthropicClient, ModelClient};
use crate::rpc::{
    read_frame, Envelope, FramedWriter, MessageChannel, RpcError, RpcResult, RpcServer, TerminalEvent,
    TutorApi,
};
use crate::store::{ConversationStore, FileConversationStore};
use crate::terminal::{ExecutionId, TerminalTracker};
use crate::{log_debug, log_error, log_info, log_warn};

pub struct TutorSession {
    workspace_root: PathBuf,
    tracker: Arc<TerminalTracker>,
    environment: Arc<StaticEnvironment>,
    gatherer: ContextGatherer,
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ConversationStore>,
    /// Sender-chosen terminal execution keys → tracker ids
    terminal_ids: Mutex<HashMap<String, ExecutionId>>,
    logger: SharedLogger,
}

impl TutorSession {
    /// Resolve settings and credentials for `workspace_root` and build a session
    /// talking to the Messages API.
    pub fn open(workspace_root: impl Into<PathBuf>, logger: SharedLogger) -> Self {
        let workspace_root = workspace_root.into();
        let layer = resolve_settings(&workspace_root, logger.clone());
        let chain = CredentialChain::standard(layer.api_key.clone(), logger.clone());
        let settings = layer.into_settings();
        let model = connect(&chain, &settings, &logger);
        Self::new(workspace_root, settings, model, logger)
    }

    /// Build a session around an explicit model client (`None`: no credentials)
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        settings: TutorSettings,
        model: Option<Arc<dyn ModelClient>>,
        logger: SharedLogger,
    ) -> Self {
        let workspace_root = workspace_root.into();
        let tracker = Arc::new(TerminalTracker::new().with_logger(logger.clone()));
        let environment = Arc::new(StaticEnvironment::new(&workspace_root));
        let gatherer = ContextGatherer::new(environment.clone(), tracker.clone());
        let registry = Arc::new(crate::tools::ToolRegistry::with_workspace_tools(
            gatherer.clone(),
            logger.clone(),
        ));

        let system_prompt = load_system_prompt(
            &workspace_root,
            settings.system_prompt_path.as_deref(),
            logger.as_ref(),
        );
        let orchestrator = Arc::new(
            Orchestrator::new(model, registry, settings)
                .with_system_prompt(system_prompt)
                .with_workspace_root(&workspace_root)
                .with_logger(logger.clone()),
        );
        let store: Arc<dyn ConversationStore> =
            Arc::new(FileConversationStore::new(&workspace_root).with_logger(logger.clone()));

        Self {
            workspace_root,
            tracker,
            environment,
            gatherer,
            orchestrator,
            store,
            terminal_ids: Mutex::new(HashMap::new()),
            logger,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn tracker(&self) -> &Arc<TerminalTracker> {
        &self.tracker
    }

    pub fn environment(&self) -> &Arc<StaticEnvironment> {
        &self.environment
    }

    pub fn gatherer(&self) -> &ContextGatherer {
        &self.gatherer
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Server answering bridge calls on `outbound`
    pub fn server(&self, outbound: Arc<dyn MessageChannel>) -> RpcServer {
        let api = TutorApi::new(self.store.clone(), self.orchestrator.clone()).with_logger(self.logger.clone());
        RpcServer::new(Arc::new(api), outbound).with_logger(self.logger.clone())
    }

    /// Serve the bridge until `reader` ends.
    ///
    /// In-flight calls are cancelled once the input closes; their tasks are
    /// awaited before returning.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> RpcResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let outbound: Arc<dyn MessageChannel> = Arc::new(FramedWriter::new(writer));
        let server = Arc::new(self.server(outbound.clone()));
        let mut reader = BufReader::new(reader);
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        log_info!(self.logger, "[session] Serving {}", self.workspace_root.display());

        let result = loop {
            match read_frame(&mut reader).await {
                Ok(Some(value)) => {
                    if let Some(task) = self.dispatch(value, &server, outbound.as_ref()).await {
                        tasks.retain(|t| !t.is_finished());
                        tasks.push(task);
                    }
                }
                Ok(None) => break Ok(()),
                Err(RpcError::InvalidFrame(e)) => log_warn!(self.logger, "[session] Skipping frame: {}", e),
                Err(e) => {
                    log_error!(self.logger, "[session] Read failed: {}", e);
                    break Err(e);
                }
            }
        };

        log_info!(self.logger, "[session] Input closed, {} task(s) in flight", tasks.len());
        server.shutdown();
        for task in tasks {
            let _ = task.await;
        }
        result
    }

    /// Route one inbound message; requests are spawned and their task returned
    pub async fn dispatch(
        &self,
        value: serde_json::Value,
        server: &Arc<RpcServer>,
        outbound: &dyn MessageChannel,
    ) -> Option<JoinHandle<()>> {
        match Envelope::decode(value) {
            Ok(Envelope::RpcRequest(request)) => return Some(server.handle(request)),
            Ok(Envelope::TerminalEvent(event)) => self.apply_terminal_event(event),
            Ok(Envelope::EditorState(update)) => {
                log_debug!(self.logger, "[session] Editor state updated");
                self.environment.apply(update);
            }
            Ok(Envelope::ShowContext) => {
                let snapshot = Envelope::ContextSnapshot {
                    snapshot: serde_json::to_value(self.gatherer.snapshot()).unwrap_or_default(),
                };
                if let Err(e) = outbound.send(&snapshot).await {
                    log_error!(self.logger, "[session] Failed to send context snapshot: {}", e);
                }
            }
            Ok(other) => log_warn!(self.logger, "[session] Unexpected inbound message: {:?}", other),
            Err((Some(id), e)) => server.reject(id, e).await,
            Err((None, e)) => log_warn!(self.logger, "[session] Ignoring message: {}", e),
        }
        None
    }

    /// Feed a shell lifecycle notification into the tracker
    pub fn apply_terminal_event(&self, event: TerminalEvent) {
        match event {
            TerminalEvent::Started {
                execution_id,
                command_line,
                cwd,
            } => {
                let id = self.tracker.command_started(command_line, cwd);
                self.terminal_ids.lock().insert(execution_id, id);
            }
            TerminalEvent::Output { execution_id, data } => {
                let id = self.terminal_ids.lock().get(&execution_id).cloned();
                match id {
                    Some(id) => {
                        self.tracker.output_received(&id, &data);
                    }
                    None => log_debug!(self.logger, "[session] Output for unknown execution {}", execution_id),
                }
            }
            TerminalEvent::Ended {
                command_line,
                exit_code,
            } => {
                if self.tracker.command_ended(&command_line, exit_code).is_some() {
                    self.prune_terminal_ids();
                }
            }
            TerminalEvent::Integration { available } => self.tracker.set_shell_integration(available),
        }
    }

    /// Forget keys whose executions were evicted from the tracker
    fn prune_terminal_ids(&self) {
        let live: HashSet<ExecutionId> = self
            .tracker
            .running()
            .into_iter()
            .chain(self.tracker.recent())
            .map(|e| e.id)
            .collect();
        self.terminal_ids.lock().retain(|_, id| live.contains(id));
    }
}

/// Model client for the resolved credential, if there is one
fn connect(chain: &CredentialChain, settings: &TutorSettings, logger: &SharedLogger) -> Option<Arc<dyn ModelClient>> {
    let Some(credential) = chain.resolve(ANTHROPIC) else {
        log_warn!(logger, "[session] No API key configured; chat will answer with setup guidance");
        return None;
    };
    log_info!(logger, "[session] Using API key from {}", credential.source);
    match AnthropicClient::from_settings(&credential.value, settings) {
        Ok(client) => Some(Arc::new(client.with_logger(logger.clone()))),
        Err(e) => {
            log_error!(logger, "[session] Cannot create model client: {}", e);
            None
        }
    }
}

impl std::fmt::Debug for TutorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorSession")
            .field("workspace_root", &self.workspace_root)
            .field("tracker", &self.tracker)
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

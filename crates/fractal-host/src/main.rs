//! fractal-host: serves one workspace's tutor session
//!
//! The UI side spawns this process and talks to it over stdin/stdout (or a
//! Unix socket) using Content-Length framed JSON. stdout carries only the
//! protocol; logs go to a file or stderr.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fractal_core::credentials::ANTHROPIC;
use fractal_core::logging::{ConsoleLogger, FileLogger, LogLevel, SharedLogger};
use fractal_core::{log_info, KeychainCredentials, TutorSession};

#[derive(Parser)]
#[command(name = "fractal-host", version, about = "Fractal tutor host process")]
struct Args {
    /// Workspace folder the session is scoped to
    #[arg(long, env = "FRACTAL_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "FRACTAL_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, env = "FRACTAL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the bridge (default)
    Serve {
        /// Listen on a Unix socket instead of stdio; serves one client
        #[arg(long)]
        socket: Option<PathBuf>,
    },
    /// Store the Anthropic API key in the system keychain (read from stdin)
    SetKey,
    /// Remove the stored API key from the system keychain
    ClearKey,
}

fn logger(args: &Args) -> SharedLogger {
    match &args.log_file {
        Some(path) => {
            let level = args
                .log_level
                .as_deref()
                .and_then(LogLevel::parse)
                .unwrap_or_else(LogLevel::from_env);
            Arc::new(FileLogger::open(path, "host").with_level(level))
        }
        None => Arc::new(ConsoleLogger::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logger = logger(&args);

    match args.command.unwrap_or(Command::Serve { socket: None }) {
        Command::Serve { socket } => {
            let workspace = std::fs::canonicalize(&args.workspace)
                .with_context(|| format!("workspace {} not found", args.workspace.display()))?;
            let session = TutorSession::open(workspace, logger.clone());
            match socket {
                Some(path) => serve_socket(&session, path, &logger).await?,
                None => session.serve(tokio::io::stdin(), tokio::io::stdout()).await?,
            }
            log_info!(logger, "[host] Session ended");
        }
        Command::SetKey => {
            eprint!("Anthropic API key: ");
            let mut key = String::new();
            std::io::stdin().lock().read_line(&mut key).context("failed to read key")?;
            KeychainCredentials::new()
                .with_logger(logger)
                .store(ANTHROPIC, &key)
                .context("failed to store key")?;
            eprintln!("Key stored in the system keychain.");
        }
        Command::ClearKey => {
            KeychainCredentials::new()
                .with_logger(logger)
                .delete(ANTHROPIC)
                .context("failed to remove key")?;
            eprintln!("Key removed.");
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn serve_socket(session: &TutorSession, path: PathBuf, logger: &SharedLogger) -> anyhow::Result<()> {
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("stale socket {}", path.display()))?;
    }
    let listener = tokio::net::UnixListener::bind(&path)
        .with_context(|| format!("failed to bind {}", path.display()))?;
    log_info!(logger, "[host] Listening on {}", path.display());

    let (stream, _) = listener.accept().await.context("accept failed")?;
    let (reader, writer) = stream.into_split();
    let result = session.serve(reader, writer).await;
    let _ = std::fs::remove_file(&path);
    Ok(result?)
}

#[cfg(not(unix))]
async fn serve_socket(_session: &TutorSession, _path: PathBuf, _logger: &SharedLogger) -> anyhow::Result<()> {
    anyhow::bail!("--socket is only supported on Unix; use stdio")
}

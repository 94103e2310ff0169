//! File-based logger for troubleshooting
//!
//! Useful when stderr isn't visible, e.g. when the host is spawned by an editor.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::traits::Logger;

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// Parse a level name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Level from `FRACTAL_LOG_LEVEL`, defaulting to debug
    pub fn from_env() -> Self {
        std::env::var("FRACTAL_LOG_LEVEL")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(LogLevel::Debug)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO "),
            LogLevel::Warn => write!(f, "WARN "),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logger that appends timestamped lines to a file
pub struct FileLogger {
    path: PathBuf,
    component: String,
    min_level: LogLevel,
    file: Mutex<Option<File>>,
}

impl FileLogger {
    /// Open (or create) `path` for appending.
    ///
    /// An unopenable file yields a logger that silently drops messages;
    /// logging must never take the host down.
    pub fn open(path: impl Into<PathBuf>, component: impl Into<String>) -> Self {
        let path = path.into();
        let enabled = std::env::var("FRACTAL_DEBUG")
            .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
            .unwrap_or(true);
        let file = if enabled { Self::open_append(&path) } else { None };
        Self {
            path,
            component: component.into(),
            min_level: LogLevel::from_env(),
            file: Mutex::new(file),
        }
    }

    /// Default log location in the temp directory
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("fractal-host.log")
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log file and keep appending to the fresh one
    pub fn clear(&self) {
        let mut guard = self.file.lock();
        if guard.is_none() {
            return;
        }
        if let Ok(file) = File::create(&self.path) {
            drop(file);
        }
        *guard = Self::open_append(&self.path);
    }

    fn open_append(path: &Path) -> Option<File> {
        OpenOptions::new().create(true).append(true).open(path).ok()
    }

    fn write(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        let mut guard = self.file.lock();
        if let Some(file) = guard.as_mut() {
            let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] [{}] [{}] {}", timestamp, level, self.component, message);
            let _ = file.flush();
        }
    }
}

impl Logger for FileLogger {
    fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }
}

impl std::fmt::Debug for FileLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogger")
            .field("path", &self.path)
            .field("min_level", &self.min_level)
            .finish()
    }
}

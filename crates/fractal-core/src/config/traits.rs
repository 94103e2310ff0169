//! Settings provider trait

use super::settings::SettingsLayer;

/// A source of (partial) settings
///
/// Implementations:
/// - `MemorySettingsProvider`: In-memory for testing
/// - `FileSettingsProvider`: YAML file (user or workspace level)
/// - `EnvSettingsProvider`: `FRACTAL_*` environment variables
pub trait SettingsProvider: Send + Sync {
    /// Human-readable name of this source, used in logs
    fn name(&self) -> &str;

    /// Read this source's layer. A missing source yields an empty layer.
    fn load(&self) -> ConfigResult<SettingsLayer>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

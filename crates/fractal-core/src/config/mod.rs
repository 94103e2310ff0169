//! Settings resolution
//!
//! Sources, lowest priority first:
//! - `FileSettingsProvider::user()`: ~/.config/fractal-tutor/config.yaml
//! - `FileSettingsProvider::workspace(root)`: <root>/.fractal/config.yaml
//! - `EnvSettingsProvider`: `FRACTAL_*` variables
//!
//! `MemorySettingsProvider` stands in for any of them in tests.

mod traits;
mod settings;
mod memory;
mod file;
mod env;
mod prompt;

use std::path::Path;

pub use traits::{SettingsProvider, ConfigError, ConfigResult};
pub use settings::{
    resolve_layers, SettingsLayer, TutorSettings, DEFAULT_API_BASE, DEFAULT_MAX_TOKENS,
    DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
pub use memory::MemorySettingsProvider;
pub use file::{FileSettingsProvider, ConfigLevel};
pub use env::EnvSettingsProvider;
pub use prompt::{default_prompt_path, load_system_prompt, FALLBACK_SYSTEM_PROMPT};

use crate::logging::SharedLogger;

/// Resolve the standard user, workspace and environment layers for `workspace_root`.
///
/// The returned layer still carries the YAML `api_key` (if any) for the
/// credential chain; call [`SettingsLayer::into_settings`] for the rest.
pub fn resolve_settings(workspace_root: &Path, logger: SharedLogger) -> SettingsLayer {
    let user = FileSettingsProvider::user();
    let workspace = FileSettingsProvider::workspace(workspace_root);
    let env = EnvSettingsProvider::new().with_logger(logger.clone());
    resolve_layers(&[&user, &workspace, &env], logger.as_ref())
}

//! File-based settings provider (YAML)
//!
//! Supports user-level (~/.config/fractal-tutor/config.yaml) and
//! workspace-level (<root>/.fractal/config.yaml) settings.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::settings::SettingsLayer;
use super::traits::{ConfigError, ConfigResult, SettingsProvider};

/// Settings level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/fractal-tutor/config.yaml)
    User,
    /// Workspace-level config (.fractal/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// YAML settings file
///
/// # Example
///
/// ```no_run
/// use fractal_core::config::{FileSettingsProvider, SettingsProvider};
///
/// let user = FileSettingsProvider::user();
/// let workspace = FileSettingsProvider::workspace("/path/to/workspace");
/// let layer = user.load().unwrap().merge(workspace.load().unwrap());
/// ```
pub struct FileSettingsProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<SettingsLayer>>,
}

impl FileSettingsProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level provider under the platform config directory
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("fractal-tutor").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level provider (`<root>/.fractal/config.yaml`)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".fractal").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> ConfigResult<SettingsLayer> {
        if !self.path.exists() {
            return Ok(SettingsLayer::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SettingsLayer::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Re-read from disk, replacing the cached layer
    pub fn reload(&self) -> ConfigResult<SettingsLayer> {
        let layer = self.read()?;
        *self.cache.write() = Some(layer.clone());
        Ok(layer)
    }
}

impl SettingsProvider for FileSettingsProvider {
    fn name(&self) -> &str {
        self.level.as_str()
    }

    fn load(&self) -> ConfigResult<SettingsLayer> {
        if let Some(layer) = self.cache.read().as_ref() {
            return Ok(layer.clone());
        }
        self.reload()
    }
}

impl std::fmt::Debug for FileSettingsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSettingsProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_layer() {
        let dir = tempdir().unwrap();
        let provider = FileSettingsProvider::workspace(dir.path());
        assert!(!provider.exists());
        assert_eq!(provider.load().unwrap(), SettingsLayer::default());
    }

    #[test]
    fn test_reads_yaml() {
        let dir = tempdir().unwrap();
        let provider = FileSettingsProvider::workspace(dir.path());
        fs::create_dir_all(provider.path().parent().unwrap()).unwrap();
        fs::write(
            provider.path(),
            "model: claude-test\nmax_tokens: 1024\ntemperature: 0.2\napi_key: sk-from-yaml\n",
        )
        .unwrap();

        let layer = provider.load().unwrap();
        assert_eq!(layer.model.as_deref(), Some("claude-test"));
        assert_eq!(layer.max_tokens, Some(1024));
        assert_eq!(layer.temperature, Some(0.2));
        assert_eq!(layer.api_key.as_deref(), Some("sk-from-yaml"));
    }

    #[test]
    fn test_cache_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let provider = FileSettingsProvider::new(&path, ConfigLevel::User);

        fs::write(&path, "model: first\n").unwrap();
        assert_eq!(provider.load().unwrap().model.as_deref(), Some("first"));

        fs::write(&path, "model: second\n").unwrap();
        assert_eq!(provider.load().unwrap().model.as_deref(), Some("first"));
        assert_eq!(provider.reload().unwrap().model.as_deref(), Some("second"));
    }

    #[test]
    fn test_malformed_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "model: [unterminated\n").unwrap();

        let err = FileSettingsProvider::new(&path, ConfigLevel::User).load().unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}

//! Environment variable settings provider

use std::collections::HashMap;
use std::str::FromStr;

use std::sync::Arc;

use crate::log_warn;
use crate::logging::{NoOpLogger, SharedLogger};
use super::settings::SettingsLayer;
use super::traits::{ConfigResult, SettingsProvider};

/// Reads `FRACTAL_*` variables. Values that fail to parse are skipped with a warning.
pub struct EnvSettingsProvider {
    overrides: Option<HashMap<String, String>>,
    logger: SharedLogger,
}

impl Default for EnvSettingsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSettingsProvider {
    /// Read from the process environment
    pub fn new() -> Self {
        Self {
            overrides: None,
            logger: Arc::new(NoOpLogger),
        }
    }

    /// Read from a fixed map instead of the process environment
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self {
            overrides: Some(vars),
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    fn var(&self, key: &str) -> Option<String> {
        let value = match &self.overrides {
            Some(map) => map.get(key).cloned(),
            None => std::env::var(key).ok(),
        }?;
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.var(key)?;
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                log_warn!(self.logger, "[config] Ignoring unparseable {}={:?}", key, raw);
                None
            }
        }
    }
}

impl SettingsProvider for EnvSettingsProvider {
    fn name(&self) -> &str {
        "env"
    }

    fn load(&self) -> ConfigResult<SettingsLayer> {
        Ok(SettingsLayer {
            model: self.var("FRACTAL_MODEL"),
            max_tokens: self.parsed("FRACTAL_MAX_TOKENS"),
            temperature: self.parsed("FRACTAL_TEMPERATURE"),
            api_base: self.var("FRACTAL_API_BASE"),
            max_tool_rounds: self.parsed("FRACTAL_MAX_TOOL_ROUNDS"),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(pairs: &[(&str, &str)]) -> EnvSettingsProvider {
        EnvSettingsProvider::from_map(
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    #[test]
    fn test_reads_known_variables() {
        let layer = provider(&[
            ("FRACTAL_MODEL", "claude-test"),
            ("FRACTAL_MAX_TOKENS", "2048"),
            ("FRACTAL_TEMPERATURE", "0.3"),
        ])
        .load()
        .unwrap();

        assert_eq!(layer.model.as_deref(), Some("claude-test"));
        assert_eq!(layer.max_tokens, Some(2048));
        assert_eq!(layer.temperature, Some(0.3));
        assert!(layer.api_key.is_none());
    }

    #[test]
    fn test_unparseable_values_are_skipped() {
        let layer = provider(&[("FRACTAL_MODEL", "m"), ("FRACTAL_MAX_TOKENS", "lots")])
            .load()
            .unwrap();
        assert_eq!(layer.model.as_deref(), Some("m"));
        assert_eq!(layer.max_tokens, None);
    }

    #[test]
    fn test_empty_environment() {
        assert_eq!(provider(&[]).load().unwrap(), SettingsLayer::default());
    }
}

//! Environment variable credentials

use std::collections::HashMap;

use super::traits::{CredentialSource, ANTHROPIC};

/// Reads API keys from environment variables.
///
/// For the `anthropic` key, `FRACTAL_API_KEY` is checked before
/// `ANTHROPIC_API_KEY`. Any other key `k` maps to `K_API_KEY`.
#[derive(Debug, Default)]
pub struct EnvCredentials {
    overrides: Option<HashMap<String, String>>,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self { overrides: None }
    }

    /// Read from a fixed map instead of the process environment
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self {
            overrides: Some(vars),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.overrides {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    fn var_names(key: &str) -> Vec<String> {
        if key.eq_ignore_ascii_case(ANTHROPIC) {
            vec!["FRACTAL_API_KEY".to_string(), "ANTHROPIC_API_KEY".to_string()]
        } else {
            vec![format!("{}_API_KEY", key.to_uppercase().replace('-', "_"))]
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        Self::var_names(key)
            .iter()
            .find_map(|name| self.var(name).and_then(super::normalize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvCredentials {
        EnvCredentials::from_map(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_fractal_key_wins() {
        let source = env(&[("FRACTAL_API_KEY", "sk-fractal"), ("ANTHROPIC_API_KEY", "sk-anthropic")]);
        assert_eq!(source.get(ANTHROPIC), Some("sk-fractal".into()));
    }

    #[test]
    fn test_blank_fractal_key_falls_through() {
        let source = env(&[("FRACTAL_API_KEY", "  "), ("ANTHROPIC_API_KEY", "sk-anthropic")]);
        assert_eq!(source.get(ANTHROPIC), Some("sk-anthropic".into()));
    }

    #[test]
    fn test_other_provider_keys() {
        let source = env(&[("MY_PROXY_API_KEY", "k")]);
        assert_eq!(source.get("my-proxy"), Some("k".into()));
        assert_eq!(source.get(ANTHROPIC), None);
    }
}

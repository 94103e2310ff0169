//! Credential lookup with fallback across sources

use std::sync::Arc;

use crate::log_debug;
use crate::logging::{NoOpLogger, SharedLogger};
use super::env::EnvCredentials;
use super::keychain::KeychainCredentials;
use super::static_source::StaticCredentials;
use super::traits::{CredentialSource, ResolvedCredential};

/// Tries each source in order and returns the first non-blank credential
pub struct CredentialChain {
    sources: Vec<Arc<dyn CredentialSource>>,
    logger: SharedLogger,
}

impl CredentialChain {
    pub fn new(sources: Vec<Arc<dyn CredentialSource>>) -> Self {
        Self {
            sources,
            logger: Arc::new(NoOpLogger),
        }
    }

    /// Environment, then keychain, then the settings-file key
    pub fn standard(settings_key: Option<String>, logger: SharedLogger) -> Self {
        Self::new(vec![
            Arc::new(EnvCredentials::new()),
            Arc::new(KeychainCredentials::new().with_logger(logger.clone())),
            Arc::new(StaticCredentials::from_settings(super::ANTHROPIC, settings_key)),
        ])
        .with_logger(logger)
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn sources(&self) -> &[Arc<dyn CredentialSource>] {
        &self.sources
    }

    pub fn resolve(&self, key: &str) -> Option<ResolvedCredential> {
        for source in self.sources.iter().filter(|s| s.is_available()) {
            if let Some(value) = source.get(key) {
                log_debug!(self.logger, "[credentials] '{}' resolved from {}", key, source.name());
                return Some(ResolvedCredential::new(value, source.name()));
            }
        }
        log_debug!(self.logger, "[credentials] '{}' not found in any source", key);
        None
    }
}

impl CredentialSource for CredentialChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn is_available(&self) -> bool {
        self.sources.iter().any(|s| s.is_available())
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|c| c.value)
    }
}

impl std::fmt::Debug for CredentialChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("CredentialChain").field("sources", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ANTHROPIC;
    use std::collections::HashMap;

    struct Unavailable;

    impl CredentialSource for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }
        fn is_available(&self) -> bool {
            false
        }
        fn lookup(&self, _key: &str) -> Option<String> {
            Some("should-not-be-read".into())
        }
    }

    fn env(pairs: &[(&str, &str)]) -> Arc<dyn CredentialSource> {
        Arc::new(EnvCredentials::from_map(
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>(),
        ))
    }

    #[test]
    fn test_priority_order() {
        let chain = CredentialChain::new(vec![
            env(&[("ANTHROPIC_API_KEY", "sk-env")]),
            Arc::new(StaticCredentials::new("keychain-stub").with(ANTHROPIC, "sk-keychain")),
            Arc::new(StaticCredentials::from_settings(ANTHROPIC, Some("sk-settings".into()))),
        ]);
        let resolved = chain.resolve(ANTHROPIC).unwrap();
        assert_eq!(resolved.value, "sk-env");
        assert_eq!(resolved.source, "environment");
    }

    #[test]
    fn test_falls_through_blank_and_missing() {
        let chain = CredentialChain::new(vec![
            env(&[("FRACTAL_API_KEY", " ")]),
            Arc::new(Unavailable),
            Arc::new(StaticCredentials::new("keychain-stub").with(ANTHROPIC, "\t")),
            Arc::new(StaticCredentials::from_settings(ANTHROPIC, Some(" sk-settings ".into()))),
        ]);
        let resolved = chain.resolve(ANTHROPIC).unwrap();
        assert_eq!(resolved.value, "sk-settings");
        assert_eq!(resolved.source, "settings");
    }

    #[test]
    fn test_nothing_configured() {
        let chain = CredentialChain::new(vec![
            env(&[]),
            Arc::new(StaticCredentials::from_settings(ANTHROPIC, None)),
        ]);
        assert!(chain.resolve(ANTHROPIC).is_none());
        assert!(chain.get(ANTHROPIC).is_none());
    }
}

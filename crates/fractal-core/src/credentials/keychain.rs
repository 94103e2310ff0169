//! OS keychain credentials
//!
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::{log_debug, log_warn};
use super::traits::{CredentialError, CredentialResult, CredentialSource};

pub const DEFAULT_SERVICE: &str = "fractal-tutor";

/// Credentials stored in the system keychain under one service name
///
/// ```no_run
/// use fractal_core::credentials::{CredentialSource, KeychainCredentials, ANTHROPIC};
///
/// let keychain = KeychainCredentials::new();
/// keychain.store(ANTHROPIC, "sk-ant-...").unwrap();
/// assert!(keychain.get(ANTHROPIC).is_some());
/// ```
pub struct KeychainCredentials {
    service: String,
    logger: SharedLogger,
}

impl KeychainCredentials {
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            logger: std::sync::Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    fn entry(&self, key: &str) -> CredentialResult<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| CredentialError::Other(format!("Failed to create keychain entry: {}", e)))
    }

    /// Save a credential (used by the host's `set-key` command)
    pub fn store(&self, key: &str, value: &str) -> CredentialResult<()> {
        let value = super::normalize(value.to_string())
            .ok_or_else(|| CredentialError::Other("Refusing to store a blank credential".into()))?;
        self.entry(key)?
            .set_password(&value)
            .map_err(|e| CredentialError::Other(format!("Failed to store in keychain: {}", e)))
    }

    /// Remove a credential; a missing entry is not an error
    pub fn delete(&self, key: &str) -> CredentialResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::Other(format!("Failed to delete from keychain: {}", e))),
        }
    }
}

impl Default for KeychainCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for KeychainCredentials {
    fn name(&self) -> &str {
        "keychain"
    }

    fn is_available(&self) -> bool {
        match Entry::new(&self.service, "__fractal_availability_check__") {
            Ok(_) => true,
            Err(e) => {
                log_warn!(self.logger, "[credentials] Keychain unavailable: {}", e);
                false
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let entry = match self.entry(key) {
            Ok(entry) => entry,
            Err(e) => {
                log_warn!(self.logger, "[credentials] {}", e);
                return None;
            }
        };
        match entry.get_password() {
            Ok(password) => Some(password),
            Err(keyring::Error::NoEntry) => {
                log_debug!(self.logger, "[credentials] No keychain entry {}:{}", self.service, key);
                None
            }
            Err(e) => {
                log_warn!(self.logger, "[credentials] Keychain read failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(KeychainCredentials::new().name(), "keychain");
    }

    #[test]
    fn test_blank_value_rejected_before_keychain() {
        let keychain = KeychainCredentials::with_service("fractal-tutor-test");
        assert!(keychain.store("anthropic", "   ").is_err());
    }

    #[test]
    #[ignore] // Requires system keychain
    fn test_store_and_get() {
        let keychain = KeychainCredentials::with_service("fractal-tutor-test");
        let _ = keychain.delete("test_key");

        keychain.store("test_key", " sk-test ").unwrap();
        assert_eq!(keychain.get("test_key"), Some("sk-test".to_string()));

        keychain.delete("test_key").unwrap();
        assert_eq!(keychain.get("test_key"), None);
    }
}

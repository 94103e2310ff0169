//! Credential lookup traits

use thiserror::Error;

/// Provider key used for the remote model's API credential
pub const ANTHROPIC: &str = "anthropic";

/// A credential together with the name of the source that supplied it
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub value: String,
    pub source: String,
}

impl ResolvedCredential {
    pub fn new(value: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: source.into(),
        }
    }
}

// Never print the secret itself.
impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential store not available: {0}")]
    NotAvailable(String),

    #[error("Credential store error: {0}")]
    Other(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Read-only source of API credentials
///
/// Implementations:
/// - `EnvCredentials`: `FRACTAL_API_KEY` / `ANTHROPIC_API_KEY`
/// - `KeychainCredentials`: the OS keychain
/// - `StaticCredentials`: a fixed value (settings file, tests)
/// - `CredentialChain`: first match across several sources
pub trait CredentialSource: Send + Sync {
    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Whether this source can be queried at all on this machine
    fn is_available(&self) -> bool {
        true
    }

    /// Raw lookup by provider key. Use [`normalize`] on the result.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Trimmed, non-blank credential for `key`
    fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).and_then(normalize)
    }
}

/// Trim a credential; blank values count as absent
pub fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

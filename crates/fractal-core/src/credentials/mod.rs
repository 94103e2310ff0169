//! API credential sources
//!
//! Lookup order used by the host: environment, OS keychain, settings file.

mod traits;
mod env;
mod keychain;
mod static_source;
mod chain;

pub use traits::{
    normalize, CredentialError, CredentialResult, CredentialSource, ResolvedCredential, ANTHROPIC,
};
pub use env::EnvCredentials;
pub use keychain::{KeychainCredentials, DEFAULT_SERVICE};
pub use static_source::StaticCredentials;
pub use chain::CredentialChain;

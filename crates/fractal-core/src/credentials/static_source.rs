//! Fixed credentials

use std::collections::HashMap;

use super::traits::CredentialSource;

/// Credentials held in memory: the settings-file `api_key`, or test fixtures
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    name: String,
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Source for the settings-file key; `None` yields an empty source
    pub fn from_settings(key: &str, api_key: Option<String>) -> Self {
        let source = Self::new("settings");
        match api_key {
            Some(value) => source.with(key, value),
            None => source,
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

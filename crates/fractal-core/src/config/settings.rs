//! Resolved tutor settings and their layering

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::log_warn;
use crate::logging::Logger;
use super::traits::SettingsProvider;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Effective settings for one host session
#[derive(Debug, Clone, PartialEq)]
pub struct TutorSettings {
    /// Model identifier sent to the Messages API
    pub model: String,
    /// Maximum output tokens per model call
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// API base URL (no trailing slash)
    pub api_base: String,
    /// Upper bound on tool-resubmission rounds per user turn
    pub max_tool_rounds: usize,
    /// Deadline for a single model call
    pub model_timeout: Duration,
    /// Deadline for a single bridge call on the client side
    pub rpc_timeout: Duration,
    /// Explicit system prompt file, if configured
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            api_base: DEFAULT_API_BASE.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            model_timeout: Duration::from_secs(120),
            rpc_timeout: Duration::from_secs(300),
            system_prompt_path: None,
        }
    }
}

/// A partial set of settings from one source; `None` means "not set here"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_rounds: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_path: Option<PathBuf>,
    /// Lowest-priority credential source; see `credentials::StaticCredentials`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl SettingsLayer {
    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merge(mut self, other: SettingsLayer) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )*
            };
        }
        take!(
            model,
            max_tokens,
            temperature,
            api_base,
            max_tool_rounds,
            model_timeout_secs,
            rpc_timeout_secs,
            system_prompt_path,
            api_key
        );
        self
    }

    /// Apply this layer over the defaults
    pub fn into_settings(self) -> TutorSettings {
        let defaults = TutorSettings::default();
        TutorSettings {
            model: self
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.model),
            max_tokens: self.max_tokens.filter(|n| *n > 0).unwrap_or(defaults.max_tokens),
            temperature: self
                .temperature
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(defaults.temperature),
            api_base: self
                .api_base
                .map(|b| b.trim_end_matches('/').to_string())
                .filter(|b| !b.is_empty())
                .unwrap_or(defaults.api_base),
            max_tool_rounds: self
                .max_tool_rounds
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_tool_rounds),
            model_timeout: self
                .model_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.model_timeout),
            rpc_timeout: self
                .rpc_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.rpc_timeout),
            system_prompt_path: self.system_prompt_path,
        }
    }
}

/// Merge all providers in order (later providers override earlier ones).
///
/// A provider that fails to load is skipped with a warning; a broken config
/// file must not prevent the host from starting with defaults.
pub fn resolve_layers(providers: &[&dyn SettingsProvider], logger: &dyn Logger) -> SettingsLayer {
    providers
        .iter()
        .fold(SettingsLayer::default(), |acc, provider| match provider.load() {
            Ok(layer) => acc.merge(layer),
            Err(e) => {
                log_warn!(logger, "[config] Ignoring settings from {}: {}", provider.name(), e);
                acc
            }
        })
}

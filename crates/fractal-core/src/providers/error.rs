//! Provider error types

use thiserror::Error;

/// Coarse cause of a failed model call, used to pick the user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or rejected credential (401)
    Unauthorized,
    /// 429
    RateLimited,
    /// 5xx, 529 or "overloaded"
    ServiceFault,
    Other,
}

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Missing API key
    #[error("API key is required for {provider}")]
    MissingApiKey { provider: String },

    /// Non-success response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// Service reported it is overloaded
    #[error("Service overloaded: {message}")]
    Overloaded { status: Option<u16>, message: String },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Request exceeded its deadline
    #[error("Request timed out")]
    Timeout,

    /// Invalid response from provider
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn overloaded(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Overloaded {
            status,
            message: message.into(),
        }
    }

    /// HTTP status, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Overloaded { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the service said it is overloaded
    pub fn is_overloaded(&self) -> bool {
        matches!(self, Self::Overloaded { .. }) || self.to_string().to_lowercase().contains("overloaded")
    }

    pub fn kind(&self) -> ErrorKind {
        if matches!(self, Self::MissingApiKey { .. }) {
            return ErrorKind::Unauthorized;
        }
        match self.status() {
            Some(401) => ErrorKind::Unauthorized,
            Some(429) => ErrorKind::RateLimited,
            Some(status) if (500..600).contains(&status) => ErrorKind::ServiceFault,
            _ if self.is_overloaded() => ErrorKind::ServiceFault,
            _ => ErrorKind::Other,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let cases = [
            (ProviderError::api(401, "invalid x-api-key"), ErrorKind::Unauthorized),
            (ProviderError::missing_api_key("anthropic"), ErrorKind::Unauthorized),
            (ProviderError::rate_limited("slow down"), ErrorKind::RateLimited),
            (ProviderError::api(429, "slow down"), ErrorKind::RateLimited),
            (ProviderError::api(500, "internal"), ErrorKind::ServiceFault),
            (ProviderError::api(503, "unavailable"), ErrorKind::ServiceFault),
            (ProviderError::overloaded(Some(529), "Overloaded"), ErrorKind::ServiceFault),
            (ProviderError::Other("upstream overloaded".into()), ErrorKind::ServiceFault),
            (ProviderError::api(400, "bad request"), ErrorKind::Other),
            (ProviderError::Timeout, ErrorKind::Other),
            (ProviderError::invalid_response("no content"), ErrorKind::Other),
        ];
        for (error, expected) in cases {
            assert_eq!(error.kind(), expected, "{}", error);
        }
    }

    #[test]
    fn test_status() {
        assert_eq!(ProviderError::api(418, "teapot").status(), Some(418));
        assert_eq!(ProviderError::rate_limited("x").status(), Some(429));
        assert_eq!(ProviderError::Cancelled.status(), None);
    }
}

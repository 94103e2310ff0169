//! Anthropic Messages API client (non-streaming)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::config::TutorSettings;
use crate::logging::{NoOpLogger, SharedLogger};
use crate::types::CancellationToken;
use crate::{log_debug, log_warn};
use super::error::{ProviderError, ProviderResult};
use super::traits::ModelClient;
use super::types::{ModelRequest, ModelResponse};

/// The Anthropic API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Map a non-success response to a `ProviderError`
pub(crate) fn error_from_response(status: u16, body: &str) -> ProviderError {
    let (kind, message) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => (parsed.error.kind, parsed.error.message),
        Err(_) => (String::new(), body.trim().to_string()),
    };
    let message = if message.is_empty() { format!("HTTP {}", status) } else { message };

    match status {
        429 => ProviderError::rate_limited(message),
        529 => ProviderError::overloaded(Some(status), message),
        _ if kind == "overloaded_error" => ProviderError::overloaded(Some(status), message),
        _ => ProviderError::api(status, message),
    }
}

/// Messages API client
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    logger: SharedLogger,
}

impl AnthropicClient {
    /// Create a client for `base_url` (e.g. `https://api.anthropic.com`)
    pub fn new(api_key: &str, base_url: &str) -> ProviderResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::missing_api_key("anthropic"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| ProviderError::Other("API key contains invalid characters".into()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(120),
            logger: Arc::new(NoOpLogger),
        })
    }

    /// Client using the base URL and deadline from settings
    pub fn from_settings(api_key: &str, settings: &TutorSettings) -> ProviderResult<Self> {
        Ok(Self::new(api_key, &settings.api_base)?.with_timeout(settings.model_timeout))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn send(&self, request: &ModelRequest) -> ProviderResult<ModelResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log_warn!(self.logger, "[anthropic] Request failed: HTTP {}", status);
            return Err(error_from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn create_message(
        &self,
        request: ModelRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<ModelResponse> {
        let request = request.for_wire();
        log_debug!(
            self.logger,
            "[anthropic] POST {} model={} messages={} tools={}",
            self.endpoint(),
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        match cancel
            .run_until_cancelled(tokio::time::timeout(self.timeout, self.send(&request)))
            .await
        {
            None => Err(ProviderError::Cancelled),
            Some(Err(_elapsed)) => Err(ProviderError::Timeout),
            Some(Ok(result)) => result,
        }
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ErrorKind, StopReason};
    use crate::types::ChatMessage;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request() -> ModelRequest {
        ModelRequest {
            model: "claude-test".into(),
            max_tokens: 64,
            temperature: 1.0,
            system: "Be brief.".into(),
            messages: vec![ChatMessage::user("hi")],
            tools: vec![],
        }
    }

    /// Serve exactly one HTTP exchange and hand back the raw request text
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (base, handle)
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let err = error_from_response(401, body);
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.to_string().contains("invalid x-api-key"));

        let overloaded = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(matches!(error_from_response(529, overloaded), ProviderError::Overloaded { status: Some(529), .. }));
        assert!(error_from_response(503, overloaded).is_overloaded());
        assert!(matches!(error_from_response(429, "{}"), ProviderError::RateLimited { .. }));

        let raw = error_from_response(502, "<html>bad gateway</html>");
        assert_eq!(raw.kind(), ErrorKind::ServiceFault);
        assert!(raw.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(
            AnthropicClient::new("  ", "https://api.anthropic.com"),
            Err(ProviderError::MissingApiKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let (base, server) = one_shot_server(
            "200 OK",
            r#"{"id":"msg_1","content":[{"type":"text","text":"Hello!"}],"stop_reason":"end_turn","usage":{"input_tokens":3,"output_tokens":2}}"#,
        )
        .await;
        let client = AnthropicClient::new("sk-test", &format!("{}/", base)).unwrap();

        let response = client.create_message(request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.joined_text(), "Hello!");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/messages"));
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("x-api-key: sk-test"));
        assert!(lower.contains("anthropic-version: 2023-06-01"));
        assert!(raw.contains(r#""system":"Be brief.""#));
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status() {
        let (base, _server) = one_shot_server(
            "429 Too Many Requests",
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of requests exceeded"}}"#,
        )
        .await;
        let client = AnthropicClient::new("sk-test", &base).unwrap();
        let err = client.create_message(request(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let client = AnthropicClient::new("sk-test", "http://127.0.0.1:9").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.create_message(request(), &cancel).await.unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
    }
}

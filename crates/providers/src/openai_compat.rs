//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI itself and any endpoint exposing
//! `POST {base_url}/chat/completions` with bearer authentication.
//!
//! One request, one attempt: this client never retries. Non-success
//! statuses become [`ProviderError::Upstream`] carrying the provider's status
//! and message; anything that prevents reading a response becomes
//! [`ProviderError::Transport`].

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use wellmed_core::error::ProviderError;
use wellmed_core::provider::{CompletionRequest, CompletionResponse};

/// An OpenAI-compatible completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            Duration::from_secs(60),
        )
    }

    /// Build the provider described by the process configuration.
    ///
    /// A missing credential is not fatal here: the gateway still starts and
    /// serves health checks, and chat requests fail with `NotConfigured`.
    pub fn from_config(config: &wellmed_config::AppConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() {
            warn!("No upstream API key configured; chat requests will fail until one is set");
        }
        Self::new(
            "openai",
            &config.upstream.base_url,
            config.api_key.clone().unwrap_or_default(),
            Duration::from_secs(config.upstream.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl wellmed_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "no upstream API key configured".into(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Transport("upstream request timed out".into())
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider returned error");
            return Err(ProviderError::Upstream {
                status_code: status.as_u16(),
                message: upstream_error_message(&error_body),
            });
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to parse response: {e}")))
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// OpenAI-style bodies look like `{"error":{"message":"..."}}`; some
/// compatible servers send `{"error":"..."}` instead. Anything else is
/// returned as its trimmed text, and an empty body as `"Unknown error"`.
fn upstream_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorField,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Detailed { message: String },
        Plain(String),
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorField::Detailed { message },
        })
        | Ok(ErrorEnvelope {
            error: ErrorField::Plain(message),
        }) if !message.trim().is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => "Unknown error".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use wellmed_core::Provider;
    use wellmed_core::message::Message;

    /// Serve `router` on an ephemeral local port and return its `/v1` base URL.
    async fn spawn_upstream(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn provider(base_url: &str, key: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", base_url, key, Duration::from_secs(5)).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![
                Message::system("You are Wellmed AI"),
                Message::user("What is the CPT code for an office visit?"),
            ],
            max_tokens: 256,
            temperature: 0.3,
        }
    }

    fn completion_body(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1719000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
        })
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = provider("http://localhost:9999/v1/", "k");
        assert_eq!(provider.base_url(), "http://localhost:9999/v1");
    }

    #[test]
    fn from_config_uses_upstream_settings() {
        let mut config = wellmed_config::AppConfig::default();
        config.upstream.base_url = "http://upstream.internal/v1".into();
        config.api_key = Some("sk-config".into());
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url(), "http://upstream.internal/v1");
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            upstream_error_message(r#"{"error":{"message":"rate limited","type":"requests"}}"#),
            "rate limited"
        );
        assert_eq!(
            upstream_error_message(r#"{"error":"model overloaded"}"#),
            "model overloaded"
        );
        assert_eq!(
            upstream_error_message("  upstream overloaded, try later\n"),
            "upstream overloaded, try later"
        );
        assert_eq!(upstream_error_message("<html>502</html>"), "<html>502</html>");
        assert_eq!(
            upstream_error_message(r#"{"detail":"bad gateway"}"#),
            r#"{"detail":"bad gateway"}"#
        );
        assert_eq!(upstream_error_message(""), "Unknown error");
        assert_eq!(upstream_error_message(" \n "), "Unknown error");
    }

    #[tokio::test]
    async fn successful_completion_sends_credential_and_parameters() {
        let seen: Arc<Mutex<Option<(String, Value)>>> = Arc::new(Mutex::new(None));
        let router = axum::Router::new().route(
            "/v1/chat/completions",
            post({
                let seen = seen.clone();
                move |headers: HeaderMap, Json(body): Json<Value>| {
                    let seen = seen.clone();
                    async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        *seen.lock().unwrap() = Some((auth, body));
                        Json(completion_body("Use 99213."))
                    }
                }
            }),
        );
        let base = spawn_upstream(router).await;

        let response = provider(&base, "sk-live").complete(request()).await.unwrap();
        assert_eq!(response.primary_content(), Some("Use 99213."));
        assert_eq!(response.usage.unwrap().total_tokens, 28);

        let (auth, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth, "Bearer sk-live");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn non_success_status_is_passed_through() {
        let router = axum::Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"error": {"message": "rate limited"}})),
                )
            }),
        );
        let base = spawn_upstream(router).await;

        let err = provider(&base, "sk-live").complete(request()).await.unwrap_err();
        match err {
            ProviderError::Upstream {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_error_body_becomes_the_message() {
        let router = axum::Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream overloaded, try later\n") }),
        );
        let base = spawn_upstream(router).await;

        let err = provider(&base, "sk-live").complete(request()).await.unwrap_err();
        match err {
            ProviderError::Upstream {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 502);
                assert_eq!(message, "upstream overloaded, try later");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_call_is_attempted_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = axum::Router::new().route(
            "/v1/chat/completions",
            post({
                let calls = calls.clone();
                move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::SERVICE_UNAVAILABLE, "busy")
                    }
                }
            }),
        );
        let base = spawn_upstream(router).await;

        let err = provider(&base, "sk-live").complete(request()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_success_body_is_transport_error() {
        let router = axum::Router::new()
            .route("/v1/chat/completions", post(|| async { "not json" }));
        let base = spawn_upstream(router).await;

        let err = provider(&base, "sk-live").complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_transport_error() {
        // Bind then drop to get a port nothing is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(&format!("http://{addr}/v1"), "sk-live")
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_upstream() {
        let err = provider("http://127.0.0.1:9/v1", "")
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}

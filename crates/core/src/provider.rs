//! Provider trait and the completion wire envelope.
//!
//! A Provider knows how to send a composed message sequence to the upstream
//! completion service and hand back its response in the provider's own
//! envelope shape. The gateway returns that envelope to callers verbatim
//! (after sanitization), so every type here keeps unknown fields around.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{Message, Role};

/// An incoming chat request as sent by the end-user client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Caller-supplied conversation, in order
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Text previously extracted from an uploaded document
    #[serde(default, alias = "pdfContent", skip_serializing_if = "Option::is_none")]
    pub document_context: Option<String>,

    /// Model identifier (falls back to the configured default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[serde(default, alias = "max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// The outbound request body sent to `/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A chat completion in the provider's native envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub object: String,

    /// Unix timestamp (seconds)
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Provider fields this gateway does not interpret (`system_fingerprint`, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,

    pub message: ResponseMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The message inside a completion choice.
///
/// `content` is optional because providers send `null` for refusals and
/// tool-call-only turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CompletionResponse {
    /// Build a locally synthesized completion carrying a fixed assistant
    /// reply. Shaped exactly like an upstream response so clients render it
    /// without a special case.
    pub fn scripted(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            object: "chat.completion".into(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: Role::Assistant.to_string(),
                    content: Some(content.into()),
                    extra: serde_json::Map::new(),
                },
                finish_reason: Some("stop".into()),
                extra: serde_json::Map::new(),
            }],
            usage: Some(Usage::default()),
            extra: serde_json::Map::new(),
        }
    }

    /// Text of the first choice, if present.
    pub fn primary_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }

    /// Mutable text of the first choice, if present.
    pub fn primary_content_mut(&mut self) -> Option<&mut String> {
        self.choices.first_mut()?.message.content.as_mut()
    }
}

/// The upstream completion seam.
///
/// The pipeline calls `complete()` exactly once per accepted request and
/// never retries; implementations must not retry either.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSTREAM_BODY: &str = r#"{
        "id": "chatcmpl-abc123",
        "object": "chat.completion",
        "created": 1719000000,
        "model": "gpt-4o-mini-2024-07-18",
        "system_fingerprint": "fp_0ba0d124f1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Use 99213.", "refusal": null},
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 42,
            "completion_tokens": 7,
            "total_tokens": 49,
            "prompt_tokens_details": {"cached_tokens": 0}
        }
    }"#;

    #[test]
    fn chat_request_accepts_camel_case_and_legacy_names() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"cpt?"}],"pdfContent":"doc","max_tokens":50}"#,
        )
        .unwrap();
        assert_eq!(req.document_context.as_deref(), Some("doc"));
        assert_eq!(req.max_tokens, Some(50));

        let req: ChatRequest =
            serde_json::from_str(r#"{"documentContext":"doc","maxTokens":10,"temperature":0.2}"#)
                .unwrap();
        assert!(req.messages.is_empty());
        assert_eq!(req.document_context.as_deref(), Some("doc"));
        assert_eq!(req.max_tokens, Some(10));
    }

    #[test]
    fn negative_max_tokens_fails_to_decode() {
        let result = serde_json::from_str::<ChatRequest>(r#"{"maxTokens":-5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_envelope_fields_survive_reencoding() {
        let parsed: CompletionResponse = serde_json::from_str(UPSTREAM_BODY).unwrap();
        assert_eq!(parsed.primary_content(), Some("Use 99213."));
        assert_eq!(parsed.usage.as_ref().unwrap().total_tokens, 49);

        let reencoded = serde_json::to_value(&parsed).unwrap();
        let original: serde_json::Value = serde_json::from_str(UPSTREAM_BODY).unwrap();
        assert_eq!(reencoded, original);
    }

    #[test]
    fn scripted_response_has_completion_shape() {
        let resp = CompletionResponse::scripted("gpt-4o-mini", "Please ask about coding.");
        assert!(resp.id.starts_with("chatcmpl-"));
        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.model, "gpt-4o-mini");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].message.role, "assistant");
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.primary_content(), Some("Please ask about coding."));
        assert_eq!(resp.usage.as_ref().unwrap().total_tokens, 0);
    }

    #[test]
    fn primary_content_mut_targets_first_choice() {
        let mut resp = CompletionResponse::scripted("m", "first");
        let mut second = resp.choices[0].clone();
        second.index = 1;
        second.message.content = Some("second".into());
        resp.choices.push(second);

        if let Some(content) = resp.primary_content_mut() {
            content.push('!');
        }
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("first!"));
        assert_eq!(resp.choices[1].message.content.as_deref(), Some("second"));
    }
}

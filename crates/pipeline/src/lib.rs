//! The Wellmed chat pipeline.
//!
//! ```text
//! ChatRequest ─► TopicClassifier ─┬─ rejected ─► Refused | ScriptedReply
//!                                 └─ accepted ─► PromptComposer ─► Provider ─► ResponseSanitizer
//! ```
//!
//! [`ChatPipeline`] is built once from [`AppConfig`] and shared by every
//! request. It holds only immutable state, so concurrent requests never
//! contend on anything but the provider's connection pool.

pub mod classifier;
pub mod composer;
pub mod sanitizer;

pub use classifier::{ClassificationResult, TopicClassifier};
pub use composer::{Persona, PromptComposer};
pub use sanitizer::{ResponseSanitizer, SanitizerError};

use std::sync::Arc;
use tracing::{debug, info, warn};
use wellmed_config::{AppConfig, GateMode};
use wellmed_core::error::PipelineError;
use wellmed_core::provider::{ChatRequest, CompletionRequest, CompletionResponse, Provider};

/// How a chat request ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// The upstream answered; content already sanitized.
    Completed(CompletionResponse),
    /// Off-topic request answered locally in the completion shape (soft gate).
    ScriptedReply(CompletionResponse),
    /// Off-topic request refused (hard gate).
    Refused { message: String },
}

/// Errors building a pipeline from configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Sanitizer(#[from] SanitizerError),
}

#[derive(Debug, Clone)]
struct GatePolicy {
    mode: GateMode,
    rejection_message: String,
    scripted_reply: String,
}

#[derive(Debug, Clone)]
struct GenerationDefaults {
    model: String,
    max_tokens: u32,
    temperature: f32,
}

/// Classify, compose, call upstream, sanitize.
pub struct ChatPipeline {
    classifier: TopicClassifier,
    composer: PromptComposer,
    sanitizer: ResponseSanitizer,
    gate: GatePolicy,
    defaults: GenerationDefaults,
    provider: Arc<dyn Provider>,
}

impl ChatPipeline {
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, SetupError> {
        let persona = Persona::from(&config.persona);
        let sanitizer = ResponseSanitizer::new(&persona.provider_tokens, persona.name.clone())?;

        Ok(Self {
            classifier: TopicClassifier::from_config(&config.topic_gate),
            composer: PromptComposer::new(persona),
            sanitizer,
            gate: GatePolicy {
                mode: config.topic_gate.mode,
                rejection_message: config.topic_gate.rejection_message.clone(),
                scripted_reply: config.topic_gate.scripted_reply.clone(),
            },
            defaults: GenerationDefaults {
                model: config.upstream.default_model.clone(),
                max_tokens: config.upstream.default_max_tokens,
                temperature: config.upstream.default_temperature,
            },
            provider,
        })
    }

    pub fn classifier(&self) -> &TopicClassifier {
        &self.classifier
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    /// Run one chat request through the pipeline.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatOutcome, PipelineError> {
        let verdict = self.classifier.classify(&request.messages);

        if !verdict.allowed {
            info!(mode = %self.gate.mode, "Topic gate rejected request");
            return Ok(match self.gate.mode {
                GateMode::Hard => ChatOutcome::Refused {
                    message: self.gate.rejection_message.clone(),
                },
                GateMode::Soft => {
                    let model = request
                        .model
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| self.defaults.model.clone());
                    ChatOutcome::ScriptedReply(CompletionResponse::scripted(
                        model,
                        self.gate.scripted_reply.clone(),
                    ))
                }
            });
        }

        debug!(keyword = ?verdict.matched_keyword, "Topic gate accepted request");

        let messages = self
            .composer
            .compose(&request.messages, request.document_context.as_deref());
        let outbound = self.resolve_parameters(&request, messages)?;
        let model = outbound.model.clone();

        let mut response = self.provider.complete(outbound).await.map_err(|e| {
            warn!(provider = self.provider.name(), model = %model, error = %e, "Upstream call failed");
            PipelineError::from(e)
        })?;

        self.sanitizer.sanitize(&mut response);
        Ok(ChatOutcome::Completed(response))
    }

    /// Apply configured defaults and validate generation parameters.
    fn resolve_parameters(
        &self,
        request: &ChatRequest,
        messages: Vec<wellmed_core::Message>,
    ) -> Result<CompletionRequest, PipelineError> {
        let model = match &request.model {
            Some(model) if model.trim().is_empty() => {
                return Err(PipelineError::Validation("model must not be empty".into()));
            }
            Some(model) => model.clone(),
            None => self.defaults.model.clone(),
        };

        let max_tokens = request.max_tokens.unwrap_or(self.defaults.max_tokens);
        if max_tokens == 0 {
            return Err(PipelineError::Validation(
                "maxTokens must be a positive integer".into(),
            ));
        }

        let temperature = request.temperature.unwrap_or(self.defaults.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(PipelineError::Validation(
                "temperature must be between 0 and 2".into(),
            ));
        }

        Ok(CompletionRequest {
            model,
            messages,
            max_tokens,
            temperature,
        })
    }
}

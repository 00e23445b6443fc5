//! Error types for the Wellmed domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each stage of the pipeline has its own error enum; the gateway maps them
//! onto `{ error, details }` HTTP payloads.

use thiserror::Error;

/// Errors raised while talking to the upstream completion service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The service answered with a non-success status.
    #[error("Upstream API error: {message} (status: {status_code})")]
    Upstream { status_code: u16, message: String },

    /// No usable response was received (connect failure, timeout,
    /// undecodable body).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// The provider's HTTP status, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Upstream { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Errors raised while turning uploaded bytes into text.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Invalid PDF structure: {0}")]
    Malformed(String),

    #[error("Encrypted PDF documents are not supported")]
    Encrypted,

    /// The parser aborted unexpectedly. The payload is kept for logs only.
    #[error("PDF parser aborted: {0}")]
    Aborted(String),
}

/// Errors that end a chat pipeline invocation.
///
/// A topic-gate rejection is not an error; see the pipeline's outcome type.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

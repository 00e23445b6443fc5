//! # Wellmed Core
//!
//! Domain types, traits, and error definitions for the Wellmed completion
//! gateway. This crate has **zero framework dependencies**: it defines the
//! request-scoped values that flow through the chat pipeline and the seams
//! (the [`Provider`] trait) that other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every value here is created at the start of a request and dropped when
//! the response is sent. Nothing in this crate holds state across requests.

pub mod document;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use document::{ExtractedDocument, MetadataValue};
pub use error::{ExtractionError, PipelineError, ProviderError};
pub use message::{Message, Role};
pub use provider::{
    ChatRequest, Choice, CompletionRequest, CompletionResponse, Provider, ResponseMessage, Usage,
};

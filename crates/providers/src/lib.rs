//! Upstream completion service clients for the Wellmed gateway.
//!
//! All providers implement the `wellmed_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

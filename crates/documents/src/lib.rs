//! Document text extraction for the Wellmed gateway.
//!
//! Turns uploaded document bytes into an [`ExtractedDocument`]. The upload
//! layer validates file type and size before bytes arrive here.
//!
//! [`ExtractedDocument`]: wellmed_core::ExtractedDocument

pub mod pdf;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use pdf::{extract_pdf, extract_pdf_blocking};

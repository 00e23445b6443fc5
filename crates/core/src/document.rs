//! Extracted document value type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single metadata value read from a document's info dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Plain text and metadata pulled out of an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// The full extracted text
    pub text: String,

    /// Number of pages in the document
    pub pages: usize,

    /// Info dictionary entries, keyed by their PDF names (`Title`, `Author`, ...)
    pub info: BTreeMap<String, MetadataValue>,
}

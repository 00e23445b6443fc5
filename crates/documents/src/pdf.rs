//! PDF extraction.
//!
//! Structure (page tree, trailer `/Info`) is read with `lopdf`; text comes
//! from `pdf-extract`. Both run on the caller's thread in
//! [`extract_pdf_blocking`]; [`extract_pdf`] moves the work to tokio's
//! blocking pool so a large parse never stalls other requests.
//!
//! The parsers are not hardened against every malformed input and may
//! panic. Panics are caught here and reported as
//! [`ExtractionError::Aborted`].

use lopdf::{Dictionary, Document, Object};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};
use wellmed_core::document::{ExtractedDocument, MetadataValue};
use wellmed_core::error::ExtractionError;

/// Extract text, page count and info metadata on the blocking pool.
pub async fn extract_pdf<B>(bytes: B) -> Result<ExtractedDocument, ExtractionError>
where
    B: AsRef<[u8]> + Send + 'static,
{
    tokio::task::spawn_blocking(move || extract_pdf_blocking(bytes.as_ref()))
        .await
        .map_err(|e| ExtractionError::Aborted(e.to_string()))?
}

/// Extract text, page count and info metadata from PDF bytes.
///
/// Pure with respect to `bytes`: the same input always yields the same
/// document, and no state is kept between calls.
pub fn extract_pdf_blocking(bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| parse(bytes))) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(reason = %reason, bytes = bytes.len(), "PDF parser panicked");
            Err(ExtractionError::Aborted(reason))
        }
    }
}

fn parse(bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Malformed("document is empty".into()));
    }

    let document =
        Document::load_mem(bytes).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    if document.trailer.get(b"Encrypt").is_ok() {
        return Err(ExtractionError::Encrypted);
    }

    let pages = document.get_pages().len();
    let info = read_info(&document);

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    debug!(pages, chars = text.len(), "PDF extracted");

    Ok(ExtractedDocument { text, pages, info })
}

/// Collect the format version plus every readable `/Info` entry.
fn read_info(document: &Document) -> BTreeMap<String, MetadataValue> {
    let mut info = BTreeMap::new();
    info.insert(
        "PDFFormatVersion".to_string(),
        MetadataValue::from(document.version.clone()),
    );

    if let Some(dict) = info_dictionary(document) {
        for (key, value) in dict.iter() {
            if let Some(value) = metadata_value(document, value, true) {
                info.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }

    info
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Convert a scalar PDF object to a metadata value. References are followed
/// one level deep only.
fn metadata_value(document: &Document, value: &Object, follow: bool) -> Option<MetadataValue> {
    match value {
        Object::String(bytes, _) => Some(MetadataValue::Text(decode_text_string(bytes))),
        Object::Name(name) => Some(MetadataValue::Text(
            String::from_utf8_lossy(name).into_owned(),
        )),
        Object::Integer(n) => Some(MetadataValue::Number(*n as f64)),
        Object::Real(n) => Some(MetadataValue::Number(f64::from(*n))),
        Object::Boolean(b) => Some(MetadataValue::Text(b.to_string())),
        Object::Reference(id) if follow => {
            let target = document.get_object(*id).ok()?;
            metadata_value(document, target, false)
        }
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// UTF-8 with a BOM, otherwise one byte per character.
fn decode_text_string(bytes: &[u8]) -> String {
    let decoded = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect::<String>()
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    };
    decoded.trim_end_matches('\0').to_string()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

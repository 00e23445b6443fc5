//! Route handlers for `/api/*`.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use wellmed_core::document::ExtractedDocument;
use wellmed_core::provider::ChatRequest;
use wellmed_pipeline::ChatOutcome;

use crate::SharedState;
use crate::error::ApiError;

/// Multipart field carrying the uploaded document.
pub const PDF_FIELD: &str = "pdf";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub environment: String,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        environment: state.environment.clone(),
    })
}

pub async fn chat(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Rejected chat body");
        ApiError::invalid_request(rejection.body_text())
    })?;

    info!(
        messages = request.messages.len(),
        has_document = request.document_context.is_some(),
        "Chat request"
    );

    match state.pipeline.handle(request).await? {
        ChatOutcome::Completed(response) | ChatOutcome::ScriptedReply(response) => {
            Ok(Json(response).into_response())
        }
        ChatOutcome::Refused { message } => Err(ApiError::topic_restricted(message)),
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub document: ExtractedDocument,
}

pub async fn analyze_pdf(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Upload is not multipart");
        no_upload()
    })?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }

        let bytes = read_pdf_field(field, state.max_upload_bytes).await?;
        info!(bytes = bytes.len(), "Analyzing uploaded PDF");

        let document = wellmed_documents::extract_pdf(bytes).await?;
        info!(pages = document.pages, chars = document.text.len(), "PDF analyzed");

        return Ok(Json(AnalyzeResponse {
            success: true,
            document,
        }));
    }

    Err(no_upload())
}

async fn read_pdf_field(field: Field<'_>, max_bytes: usize) -> Result<Bytes, ApiError> {
    if !is_pdf(field.content_type()) {
        warn!(content_type = ?field.content_type(), "Rejected non-PDF upload");
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Invalid File Type",
            "Only PDF files are allowed",
        ));
    }

    let bytes = field.bytes().await.map_err(multipart_error)?;
    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(bytes)
}

/// `application/pdf`, ignoring case and parameters.
fn is_pdf(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/pdf"))
}

fn no_upload() -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "No PDF file uploaded",
        format!("Send the document as multipart form field '{PDF_FIELD}'"),
    )
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        "File Too Large",
        format!("PDF uploads are limited to {max_bytes} bytes"),
    )
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "File Too Large", err.body_text());
    }
    ApiError::invalid_request(err.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_content_type_detection() {
        assert!(is_pdf(Some("application/pdf")));
        assert!(is_pdf(Some("Application/PDF; name=chart.pdf")));
        assert!(!is_pdf(Some("text/plain")));
        assert!(!is_pdf(Some("application/pdfx")));
        assert!(!is_pdf(None));
    }
}

//! The `{ error, details }` payload every failing endpoint returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;
use wellmed_core::error::{ExtractionError, PipelineError, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

/// An error response: status plus `{ error, details }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details: details.into(),
            },
        }
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid Request", details)
    }

    pub fn topic_restricted(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Topic Restricted", details)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "An unexpected error occurred",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Upstream {
                status_code,
                message,
            } => {
                // Statuses outside 400..=599 are not errors axum should echo.
                let status = StatusCode::from_u16(status_code)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                Self::new(status, "Upstream API Error", message)
            }
            ProviderError::Transport(reason) => {
                error!(reason = %reason, "Upstream unreachable");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream Unavailable",
                    "The completion service could not be reached",
                )
            }
            ProviderError::NotConfigured(reason) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Upstream Not Configured",
                reason,
            ),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(details) => Self::invalid_request(details),
            PipelineError::Provider(err) => err.into(),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        let details = match &err {
            ExtractionError::Malformed(reason) => {
                error!(reason = %reason, "PDF could not be parsed");
                "The uploaded file is not a readable PDF document".to_string()
            }
            ExtractionError::Encrypted => err.to_string(),
            ExtractionError::Aborted(reason) => {
                error!(reason = %reason, "PDF extraction aborted");
                "The document could not be processed".to_string()
            }
        };
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "PDF Analysis Error", details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_passed_through() {
        let err = ApiError::from(ProviderError::Upstream {
            status_code: 429,
            message: "rate limited".into(),
        });
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.body.error, "Upstream API Error");
        assert_eq!(err.body.details, "rate limited");
    }

    #[test]
    fn non_error_upstream_status_becomes_bad_gateway() {
        let err = ApiError::from(ProviderError::Upstream {
            status_code: 200,
            message: "odd".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn transport_failure_is_a_generic_500() {
        let err = ApiError::from(ProviderError::Transport("connection refused".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.error, "Upstream Unavailable");
        assert!(!err.body.details.contains("refused"));
    }

    #[test]
    fn validation_maps_to_invalid_request() {
        let err = ApiError::from(PipelineError::Validation("bad temperature".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "Invalid Request");
    }

    #[test]
    fn extraction_internals_are_not_exposed() {
        let err = ApiError::from(ExtractionError::Aborted("index out of bounds".into()));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body.error, "PDF Analysis Error");
        assert!(!err.body.details.contains("index"));
    }
}

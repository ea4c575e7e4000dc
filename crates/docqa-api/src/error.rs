//! API error types and JSON error response formatting.
//!
//! ApiError gives every endpoint the same `{"error", "message"}` body and
//! maps retrieval and extraction failures to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docqa_extract::ExtractError;
use docqa_vector::RetrievalError;
use serde::{Deserialize, Serialize};

/// Message returned when an upload contains no usable text.
pub const UNREADABLE_MESSAGE: &str =
    "Document has no readable text (scanned PDFs are not supported)";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "bad_request", "empty_or_unreadable").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 - missing body or blank question.
    BadRequest(String),
    /// 422 - the document was read but holds too little text to index.
    EmptyOrUnreadable { chars: usize, min_chars: usize },
    /// 415 - not a PDF and not text.
    UnsupportedMediaType(String),
    /// 422 - looked like a supported type but could not be parsed.
    UnprocessableEntity(String),
    /// 500
    Internal(String),
    /// 503 - embedding backend not usable.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::EmptyOrUnreadable { chars, min_chars } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "empty_or_unreadable",
                UNREADABLE_MESSAGE.to_string(),
                Some(serde_json::json!({ "chars": chars, "min_chars": min_chars })),
            ),
            ApiError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                msg,
                None,
            ),
            ApiError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable_entity",
                msg,
                None,
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal API error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::EmptyOrUnreadableInput { chars, min_chars } => {
                ApiError::EmptyOrUnreadable { chars, min_chars }
            }
            RetrievalError::EmbeddingUnavailable(msg) => {
                ApiError::ServiceUnavailable(format!("Embedding backend unavailable: {}", msg))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Empty => ApiError::BadRequest("Uploaded file is empty".to_string()),
            ExtractError::Unsupported(_) => ApiError::UnsupportedMediaType(err.to_string()),
            ExtractError::Pdf(_) => ApiError::UnprocessableEntity(err.to_string()),
            ExtractError::Task(msg) => ApiError::Internal(msg),
        }
    }
}

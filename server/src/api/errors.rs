//! API error types mapped to HTTP status codes.
//!
//! Every [`ApiError`] produces a JSON body of the form
//! `{"error": "<summary>", "details": {"message": "<text>"}}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use semsearch_retrieval::RetrievalError;
use serde_json::json;
use tracing::{error, warn};

/// Application-level error type that implements `IntoResponse`.
///
/// - `InvalidInput` → 400 (malformed or incomplete request body)
/// - `InvalidQuery` → 400 (well-formed request the engine rejected)
/// - `NoDocuments` → 503
/// - `Internal` → 500
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    InvalidQuery(String),
    NoDocuments,
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NoDocuments => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "Invalid input",
            ApiError::InvalidQuery(_) => "Invalid query",
            ApiError::NoDocuments => "No documents indexed",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let summary = self.summary();
        let message = match self {
            ApiError::InvalidInput(msg) | ApiError::InvalidQuery(msg) | ApiError::Internal(msg) => {
                msg
            }
            ApiError::NoDocuments => "Please run the ingest command first".to_string(),
        };

        let body = Json(json!({
            "error": summary,
            "details": { "message": message },
        }));
        (status, body).into_response()
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::EmptyCorpus => ApiError::NoDocuments,
            err if err.is_invalid_input() => {
                warn!("Rejected query: {err}");
                ApiError::InvalidQuery(err.to_string())
            }
            err => {
                error!("Query failed: {err}");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

//! Crate-wide error taxonomy and its HTTP mapping.
//!
//! Every handler returns `Result<Json<T>, ApiError>`; the conversion here is
//! the single place where failures turn into status codes and the
//! `{"error": "..."}` body the frontend expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed required input. Client's fault.
    #[error("{0}")]
    Validation(String),

    /// Lookup by key found nothing.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A database operation failed. The enclosing transaction (if any) has
    /// already been rolled back by the time this surfaces.
    #[error("database error: {0}")]
    Persistence(String),

    /// Model output was unparsable or failed schema validation. Not retried.
    #[error("generation error: {0}")]
    Generation(String),

    /// Network/HTTP failure calling an external API. Not retried.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Persistence(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) | ApiError::Generation(_) | ApiError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(target: "eduverse_backend", %status, error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

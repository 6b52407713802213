//! Error types for the stub backend.
//!
//! [`StubError`] converts into an Axum response so a broken script shows
//! up at the client as a 500 with a JSON body, the same shape the real
//! backend uses for its failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors raised while serving scripted replies or loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum StubError {
    /// A scripted reply names a status code HTTP does not allow.
    #[error("invalid scripted status: {0}")]
    InvalidStatus(u16),

    /// A campaign catalog could not be parsed.
    #[error("invalid catalog: {0}")]
    Catalog(String),
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

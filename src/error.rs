// src/error.rs
// Crate-wide error taxonomy for CRACE

use thiserror::Error;

/// Main error type for the CRACE engine.
///
/// Leaf modules (parsers, embedders, the watcher) use `anyhow::Result`
/// internally and swallow their own errors with structured logging; this
/// type is for boundaries that need to match on kind (API handlers,
/// orchestrator stages).
#[derive(Error, Debug)]
pub enum CraceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CraceError>;

impl CraceError {
    /// HTTP status code implied by this error's kind (§7 error table).
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CraceError::NotFound(_) => StatusCode::NOT_FOUND,
            CraceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CraceError::BackendUnavailable(_)
            | CraceError::CapacityExceeded(_)
            | CraceError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            CraceError::Io(_)
            | CraceError::Json(_)
            | CraceError::Notify(_)
            | CraceError::Internal(_)
            | CraceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for CraceError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({ "ok": false, "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

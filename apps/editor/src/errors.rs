use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the document core and the section editor.
///
/// None of these are fatal: the worst case is a session that stays dirty until
/// a retry or a manual save succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Section already exists: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Editing session is closed")]
    SessionClosed,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Failures reported by a `DocumentStore`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum PersistenceError {
    #[error("Document {0} not found")]
    NotFound(Uuid),

    #[error("Document rejected by store: {0}")]
    Validation(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl PersistenceError {
    /// Conflicts and transport failures are retried by the autosave timer.
    /// Everything else waits for the user to act.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PersistenceError::Conflict(_) | PersistenceError::Transport(_)
        )
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Upstream store error: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EditorError> for AppError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Validation(msg) => AppError::Validation(msg),
            EditorError::DuplicateKey(key) => {
                AppError::DuplicateKey(format!("section already exists: {key}"))
            }
            EditorError::NotFound(msg) => AppError::NotFound(msg),
            EditorError::InvalidState(msg) => AppError::Conflict(msg),
            EditorError::SessionClosed => {
                AppError::Conflict("editing session is closed".to_string())
            }
            EditorError::Persistence(e) => e.into(),
        }
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(id) => AppError::NotFound(format!("Document {id} not found")),
            PersistenceError::Validation(msg) => AppError::UnprocessableEntity(msg),
            PersistenceError::Conflict(msg) => AppError::Conflict(msg),
            PersistenceError::Transport(msg) => AppError::BadGateway(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::DuplicateKey(msg) => (StatusCode::CONFLICT, "DUPLICATE_KEY", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::BadGateway(msg) => {
                tracing::error!("Store error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "STORE_UNAVAILABLE",
                    "The document store could not be reached".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

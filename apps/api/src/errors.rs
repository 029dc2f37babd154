use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// When set, 5xx responses carry the underlying error message in `error`.
static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Called once at startup; only development deployments expose details.
pub fn expose_error_details(enabled: bool) {
    EXPOSE_ERROR_DETAILS.store(enabled, Ordering::Relaxed);
}

/// A single rejected request field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed")]
    InvalidFields(Vec<FieldError>),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_)
            | AppError::Workflow(_)
            | AppError::S3(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors, detail): (String, Option<&Vec<FieldError>>, Option<String>) =
            match &self {
                AppError::NotFound(msg)
                | AppError::Validation(msg)
                | AppError::UnprocessableEntity(msg)
                | AppError::Unauthorized(msg)
                | AppError::Forbidden(msg)
                | AppError::Conflict(msg) => (msg.clone(), None, None),
                AppError::InvalidFields(fields) => {
                    ("Validation failed".to_string(), Some(fields), None)
                }
                AppError::PayloadTooLarge => (
                    "Request body is too large".to_string(),
                    None,
                    None,
                ),
                AppError::TooManyRequests => (
                    "Too many requests from this IP, please try again later.".to_string(),
                    None,
                    None,
                ),
                AppError::Database(e) => {
                    tracing::error!("Database error: {e}");
                    (
                        "A database error occurred".to_string(),
                        None,
                        Some(e.to_string()),
                    )
                }
                AppError::Workflow(msg) => {
                    tracing::error!("Workflow error: {msg}");
                    (
                        "Failed to trigger AI roadmap generation".to_string(),
                        None,
                        Some(msg.clone()),
                    )
                }
                AppError::S3(msg) => {
                    tracing::error!("S3 error: {msg}");
                    (
                        "A storage error occurred".to_string(),
                        None,
                        Some(msg.clone()),
                    )
                }
                AppError::Internal(e) => {
                    tracing::error!("Internal error: {e:?}");
                    (
                        "Something went wrong!".to_string(),
                        None,
                        Some(e.to_string()),
                    )
                }
            };

        let mut body = json!({
            "success": false,
            "message": message,
        });
        if let (Some(fields), Value::Object(map)) = (errors, &mut body) {
            map.insert("errors".to_string(), json!(fields));
        }
        if EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed) {
            if let (Some(detail), Value::Object(map)) = (detail, &mut body) {
                map.insert("error".to_string(), Value::String(detail));
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Body rejections become 400s in the usual envelope, except an oversized
/// body which keeps its 413.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

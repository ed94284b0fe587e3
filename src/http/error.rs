//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (malformed or semantically illegal)
    BadRequest(String),
    /// Well-formed request with field values that fail validation
    Unprocessable(String),
    /// Request conflicts with the current state of the resource
    Conflict(String),
    /// Internal server error
    Internal(String),
    /// Repository error
    Repository(RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("UNPROCESSABLE_ENTITY", msg),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => {
                let msg = e.to_string();
                match e {
                    RepositoryError::NotFound { .. } => {
                        (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg))
                    }
                    RepositoryError::Conflict { .. } => {
                        (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg))
                    }
                    RepositoryError::ValidationError { .. } => (
                        StatusCode::BAD_REQUEST,
                        ApiError::new("VALIDATION_ERROR", msg),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("REPOSITORY_ERROR", msg),
                    ),
                }
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn repository_errors_map_to_matching_statuses() {
        assert_eq!(
            status_of(RepositoryError::not_found("missing").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RepositoryError::conflict("taken").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RepositoryError::validation("bad field").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RepositoryError::query("boom").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_failures_at_the_boundary_are_unprocessable() {
        assert_eq!(
            status_of(AppError::Unprocessable("ts_sec must be >= 0".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}

//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::policy::PolicyError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("The given data was invalid.")]
    ValidationFailed(ValidationErrors),

    /// Ownership or delete-guard refusal. The reason stays in the log only.
    #[error("This action is unauthorized.")]
    Forbidden(#[from] PolicyError),

    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: i64 },

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: &'static str, id: impl Into<i64>) -> Self {
        AppError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationFailed(errors)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { resource, id } => AppError::NotFound { resource, id },
            StoreError::Rejected(reason) => AppError::Forbidden(reason),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => ("invalid_request", Some(msg.clone())),

            // 401 Unauthorized
            AppError::Unauthenticated => ("unauthenticated", None),

            // 422 Unprocessable Entity
            AppError::ValidationFailed(_) => ("validation_failed", None),

            // 403 Forbidden
            AppError::Forbidden(reason) => {
                tracing::info!(reason = %reason, "Request forbidden");
                ("forbidden", None)
            }

            // 404 Not Found
            AppError::NotFound { .. } => ("not_found", None),

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("internal_error", None)
            }
        };

        let error = match &self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let errors = match self {
            AppError::ValidationFailed(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

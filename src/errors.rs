//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned when a row lock or distributed lock could not be taken.
pub const CONCURRENT_UPDATE_MESSAGE: &str = "Concurrent update detected - please retry";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Validation
    #[error("{0}")]
    Validation(String),

    // Concurrency
    #[error("{}", CONCURRENT_UPDATE_MESSAGE)]
    ConcurrentUpdate,

    #[error("{0}")]
    Locked(String),

    // External service errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("External service error: {0}")]
    External(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ConcurrentUpdate => "CONCURRENT_UPDATE",
            AppError::Locked(_) => "LOCKED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::External(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ConcurrentUpdate => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Locked(msg) => msg.clone(),

            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            AppError::External(msg) => {
                tracing::error!("External service error: {}", msg);
                "An upstream service is unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }

    /// Whether a retry of the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::ConcurrentUpdate
                | AppError::Locked(_)
                | AppError::External(_)
                | AppError::Database(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::External(e.to_string())
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn locked(msg: impl Into<String>) -> Self {
        AppError::Locked(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        AppError::External(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_update_maps_to_conflict() {
        let err = AppError::ConcurrentUpdate;
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), CONCURRENT_UPDATE_MESSAGE);
    }

    #[test]
    fn test_locked_keeps_message() {
        let err = AppError::locked("Draft operation in progress for this player, please wait");
        assert_eq!(err.status(), StatusCode::LOCKED);
        assert_eq!(
            err.user_message(),
            "Draft operation in progress for this player, please wait"
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::internal("redis exploded");
        assert_eq!(err.user_message(), "An internal error occurred");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_errors() {
        assert!(AppError::ConcurrentUpdate.is_transient());
        assert!(AppError::external("timeout").is_transient());
        assert!(!AppError::validation("bad").is_transient());
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Coarse classification of an [`AppError`]
///
/// Callers dispatch on this rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ModelUnavailable,
    Cancelled,
    InvalidInput,
    Internal,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("recommendation model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("request cancelled or deadline exceeded")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error ({context}): {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps a sqlx failure with the operation that produced it
    pub fn database(context: &'static str, source: sqlx::Error) -> Self {
        AppError::Database { context, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::UserNotFound(_) => ErrorKind::NotFound,
            AppError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            AppError::Cancelled => ErrorKind::Cancelled,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::Database { .. }
            | AppError::Cache(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::UserNotFound(id) => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                format!("User with ID {} does not exist", id),
            ),
            AppError::ModelUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model_unavailable",
                "Recommendation model is temporarily unavailable".to_string(),
            ),
            AppError::Cancelled => (
                StatusCode::GATEWAY_TIMEOUT,
                "request_timeout",
                "Request timed out, please try again".to_string(),
            ),
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_parameter", msg.clone())
            }
            AppError::Database { .. }
            | AppError::Cache(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Unhandled internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("schedule error: {0}")]
    Schedule(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("streaming error: {0}")]
    Streaming(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("rate limited, retry in {wait_seconds}s")]
    RateLimited { wait_seconds: u64 },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(ref msg) => {
                tracing::error!("configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration error".to_string())
            }
            AppError::Schedule(ref msg) => {
                tracing::error!("schedule error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "schedule error".to_string())
            }
            AppError::Io(ref e) => {
                tracing::error!("io error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "io error".to_string())
            }
            AppError::Database(ref e) => {
                tracing::error!("database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database error".to_string())
            }
            AppError::Streaming(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::RateLimited { wait_seconds } => {
                let body = Json(json!({
                    "error": "rate limited",
                    "wait_seconds": wait_seconds,
                }));
                return (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            }
            AppError::Internal(ref e) => {
                tracing::error!("internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

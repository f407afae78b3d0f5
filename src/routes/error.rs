use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::StoreError;
use crate::services::generator::GenerationError;
use crate::services::mailer::DispatchError;
use crate::services::storage::StorageError;

/// Error returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("job {id}")),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg.clone())
            }
            ApiError::Store(e) => {
                tracing::error!("Job store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "The job store is unavailable".to_string(),
                )
            }
            ApiError::Storage(e) => {
                tracing::error!("Object storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            ApiError::Generation(e @ GenerationError::MissingApiKey) => {
                (StatusCode::BAD_REQUEST, "MISSING_CREDENTIALS", e.to_string())
            }
            ApiError::Dispatch(e @ DispatchError::CredentialsMissing) => {
                (StatusCode::BAD_REQUEST, "MISSING_CREDENTIALS", e.to_string())
            }
            ApiError::Generation(e) => {
                tracing::error!("Email generation failed: {e}");
                (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", e.to_string())
            }
            ApiError::Dispatch(e) => {
                tracing::error!("Email dispatch failed: {e}");
                (StatusCode::BAD_GATEWAY, "DISPATCH_FAILED", e.to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
///
/// The variant carries the failure kind all the way to the HTTP boundary;
/// nothing below the boundary is allowed to collapse distinct kinds into a
/// generic one.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failure: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage write failure: {0}")]
    StorageWrite(String),

    #[error("Storage read failure: {0}")]
    StorageRead(String),

    #[error("Storage delete failure: {0}")]
    StorageDelete(String),

    /// A record references a blob the store claims does not exist. Distinct
    /// from NotFound: it indicates a prior protocol violation, not a
    /// legitimate miss.
    #[error("Storage inconsistency: record {id} references missing blob {key}")]
    StorageInconsistency { id: String, key: String },

    /// Blob write succeeded but metadata creation failed. The blob now sits
    /// unreferenced in the store under `key` until an operator reconciles it.
    #[error("Uploaded but not catalogued: blob {key} has no metadata record ({reason})")]
    OrphanedBlob { key: String, reason: String },

    #[error("Notification failure: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn success_message(message: &str) -> ApiResponse<()> {
        ApiResponse {
            code: 0,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn error(code: i32, message: &str) -> ApiResponse<()> {
        ApiResponse {
            code,
            message: message.to_string(),
            data: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 500, "Database error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 404, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 400, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 401, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 403, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, 409, msg.clone()),
            AppError::StorageWrite(msg) => {
                tracing::error!("Storage write failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 500, msg.clone())
            }
            AppError::StorageRead(msg) => {
                tracing::error!("Storage read failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 500, msg.clone())
            }
            AppError::StorageDelete(msg) => {
                tracing::error!("Storage delete failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 500, msg.clone())
            }
            AppError::StorageInconsistency { id, key } => {
                tracing::error!(
                    "Storage inconsistency: record {} references missing blob {}",
                    id,
                    key
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    500,
                    "Storage inconsistency".to_string(),
                )
            }
            AppError::OrphanedBlob { key, reason } => {
                tracing::error!("Uploaded but not catalogued: blob {} ({})", key, reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    500,
                    "File uploaded but not catalogued".to_string(),
                )
            }
            AppError::Notification(msg) => {
                tracing::warn!("Notification failure: {}", msg);
                (StatusCode::BAD_GATEWAY, 502, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 500, msg.clone())
            }
            AppError::Jwt(e) => {
                tracing::warn!("JWT error: {:?}", e);
                (StatusCode::UNAUTHORIZED, 401, "Invalid token".to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 500, "IO error".to_string())
            }
        };

        let body = Json(ApiResponse::<()>::error(code, &message));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use crate::services::storage_service::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Boxed source error carried by infrastructure failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse failure classes shared by every pipeline stage.
///
/// Validation failures are never worth redelivering unchanged; parse failures
/// reject a whole file; infrastructure failures are left to redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Parse,
    Infrastructure,
}

/// Errors raised by the gateway, parser and consumer stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to parse CSV `{key}`: {source}")]
    Parse {
        key: String,
        #[source]
        source: csv_async::Error,
    },

    #[error("object `{key}` in bucket `{bucket}` has an empty body")]
    EmptyObject { bucket: String, key: String },

    #[error("message `{message_id}` has an undecodable body: {source}")]
    Decode {
        message_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("message `{message_id}` is missing field `{field}`")]
    MissingField { message_id: String, field: &'static str },

    #[error("batch of {size} messages exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("{operation} failed: {source}")]
    Infrastructure {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Wrap a storage, queue, notification or persistence failure.
    pub fn infrastructure(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Infrastructure {
            operation,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::Decode { .. }
            | Self::MissingField { .. }
            | Self::BatchTooLarge { .. } => ErrorKind::Validation,
            Self::Parse { .. } | Self::EmptyObject { .. } => ErrorKind::Parse,
            Self::Infrastructure { .. } => ErrorKind::Infrastructure,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 403 Forbidden
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err.kind() {
            ErrorKind::Validation => AppError::new(StatusCode::BAD_REQUEST, err.to_string()),
            _ => AppError::internal("Internal server error"),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound { .. } => {
                AppError::new(StatusCode::NOT_FOUND, err.to_string())
            }
            StorageError::InvalidBucketName { .. } | StorageError::InvalidObjectKey => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            StorageError::BucketAlreadyExists(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
            StorageError::Sqlx(_) | StorageError::Io(_) => {
                tracing::error!("storage failure: {}", err);
                AppError::internal("Internal server error")
            }
        }
    }
}

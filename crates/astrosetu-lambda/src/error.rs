use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use astrosetu_core::error::CoreError;
use astrosetu_core::models::report::ErrorCode;
use astrosetu_storage::error::StorageError;
use astrosetu_worker::error::WorkerError;

/// Unified API error type for all route handlers.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<ErrorCode>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error_code) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Some(ErrorCode::NotFound)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                error_code,
            }),
        )
            .into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidInput(_)
            | CoreError::UnknownReportType(_)
            | CoreError::InvalidUuid(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { key } => {
                ApiError::NotFound(format!("object not found: {key}"))
            }
            StorageError::MissingReport { report_id } => {
                ApiError::NotFound(format!("report {report_id} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            WorkerError::ReportTypeMismatch { .. } => ApiError::BadRequest(e.to_string()),
            WorkerError::Storage(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::db::StoreError;
use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Local image not found: {0}")]
    LocalFileMissing(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    /// Some counterpart documents were already rewritten when the failure
    /// happened. A deletion journal records the unfinished work.
    #[error("Cleanup of user {user_id} stopped during {stage}: {detail}")]
    PartialCleanup {
        user_id: String,
        stage: String,
        detail: String,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => AppError::NotFound(path),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Upload(err.to_string())
    }
}

/// Outcome of a single admin operation in `(success, message)` form.
///
/// Batch callers (multi-select deletion, purges) collect one of these per id
/// and keep going after failures.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl<T: std::fmt::Display> From<std::result::Result<T, AppError>> for OperationResult {
    fn from(result: std::result::Result<T, AppError>) -> Self {
        match result {
            Ok(report) => Self {
                success: true,
                message: report.to_string(),
            },
            Err(err) => Self {
                success: false,
                message: err.to_string(),
            },
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::LocalFileMissing(path) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "local_file_missing",
                Some(path.clone()),
            ),
            AppError::Upload(msg) => (StatusCode::BAD_GATEWAY, "upload_failed", Some(msg.clone())),
            AppError::PartialCleanup { .. } => {
                tracing::error!(error = %self, "Partial cleanup");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "partial_cleanup",
                    Some(self.to_string()),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;

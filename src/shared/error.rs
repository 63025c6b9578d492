//! Application Error Types
//!
//! Centralized error handling with Axum integration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::query::FilterError;

/// Storage layer error type shared by every backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Row {id} not found in {table}")]
    RowNotFound { table: &'static str, id: i64 },

    #[error("Unknown field '{field}' for table {table}")]
    UnknownField { table: &'static str, field: String },

    #[error("Failed to decode row: {0}")]
    Decode(String),

    #[error("Transaction {id} is already {state}")]
    TransactionFinalized { id: u64, state: &'static str },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Classify a driver error, keeping unique violations apart.
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::UniqueViolation(db.message().to_string())
            }
            _ => Self::Database(error),
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Query execution failed: {0}")]
    QueryExecution(#[source] StorageError),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Transaction failed: {0}")]
    TransactionFailed(#[source] Box<AppError>),
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::RowNotFound { table, id } => {
                AppError::NotFound(format!("{} {} not found", table, id))
            }
            StorageError::UniqueViolation(msg) => AppError::Conflict(msg),
            other => AppError::Storage(other),
        }
    }
}

impl AppError {
    /// Wrap the cause of an aborted transaction.
    pub fn transaction_failed(cause: AppError) -> Self {
        AppError::TransactionFailed(Box::new(cause))
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::BadRequest(_)
                | AppError::Conflict(_)
                | AppError::Validation { .. }
                | AppError::Filter(_)
        )
    }

    /// The error that started it all, looking through transaction wrappers.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::TransactionFailed(cause) => cause.root_cause(),
            other => other,
        }
    }

    fn status_and_code(&self) -> (StatusCode, u16, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, 10005, msg.clone()),
            AppError::Validation { message, .. } => {
                (StatusCode::BAD_REQUEST, 10007, message.clone())
            }
            AppError::Filter(e) => (StatusCode::BAD_REQUEST, 10008, e.to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::QueryExecution(e) => {
                tracing::error!(error = %e, "Query execution error");
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::TransactionFailed(cause) => {
                tracing::error!(cause = %cause, "Transaction failed");
                (StatusCode::INTERNAL_SERVER_ERROR, 10009, "Transaction failed".into())
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_code();
        let errors = match self {
            AppError::Validation { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        };

        let body = ErrorResponse {
            code,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_errors_are_bad_requests() {
        let error = AppError::from(FilterError::MalformedFilter {
            key: "where__a__b__c".into(),
        });
        assert!(error.is_client_error());
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transaction_failure_hides_storage_cause() {
        let cause = AppError::Storage(StorageError::Unavailable("pool closed".into()));
        let error = AppError::transaction_failed(cause);
        assert!(!error.is_client_error());
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_transaction_failure_is_server_error_even_for_client_cause() {
        let error = AppError::transaction_failed(AppError::NotFound("post 7 not found".into()));
        assert!(matches!(error.root_cause(), AppError::NotFound(_)));
        assert!(error.root_cause().is_client_error());

        let (status, code, message) = error.status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, 10009);
        assert_eq!(message, "Transaction failed");
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_response_lists_fields() {
        let error = AppError::Validation {
            message: "title: Title is required".into(),
            errors: vec![FieldError {
                field: "title".into(),
                message: "Title is required".into(),
            }],
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "code": 10007,
                "message": "title: Title is required",
                "errors": [{"field": "title", "message": "Title is required"}]
            })
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error = AppError::from(StorageError::RowNotFound { table: "posts", id: 3 });
        assert!(matches!(error, AppError::NotFound(msg) if msg == "posts 3 not found"));
    }
}

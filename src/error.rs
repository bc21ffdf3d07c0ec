//! Error types for prime-counter
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (validation, scheduling, lookup, store)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{TaskId, TaskState};

/// Result type alias for prime-counter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for prime-counter
#[derive(Debug, Error)]
pub enum Error {
    /// Submission input is malformed or out of range
    #[error("invalid {field}: {message}")]
    Validation {
        /// The request field that failed validation (e.g., "n", "chunks")
        field: String,
        /// Human-readable description of the constraint that was violated
        message: String,
    },

    /// The fan-out or its join could not be scheduled
    #[error("failed to submit job: {0}")]
    Scheduling(String),

    /// No task with this id is known to the job store
    #[error("job {0} not found")]
    JobNotFound(TaskId),

    /// A task was asked to move to a state it cannot reach from its current one
    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The task whose transition was rejected
        id: TaskId,
        /// The state the task is currently in
        from: TaskState,
        /// The state that was requested
        to: TaskState,
    },

    /// A worker unit failed to count its range
    #[error("worker error: {0}")]
    Worker(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker_concurrency")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Shorthand for a validation error on `field`
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored row could not be decoded
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord {
        /// Id of the row that failed to decode
        id: String,
        /// What was wrong with it
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "invalid n: must be at least 10000",
///     "details": {
///       "field": "n"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Validation { .. } => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::JobNotFound(_) => 404,

            // 409 Conflict - terminal tasks are immutable
            Error::InvalidTransition { .. } => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Scheduling(_) => 500,
            Error::Worker(_) => 500,
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::Scheduling(_) => "scheduling_error",
            Error::JobNotFound(_) => "job_not_found",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Worker(_) => "worker_error",
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Validation { field, .. } => Some(serde_json::json!({
                "field": field,
            })),
            Error::JobNotFound(id) => Some(serde_json::json!({
                "job_id": id.to_string(),
            })),
            Error::InvalidTransition { id, from, to } => Some(serde_json::json!({
                "task_id": id.to_string(),
                "from": from.as_str(),
                "to": to.as_str(),
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        match details {
            Some(details) => Self::with_details(code, message, details),
            None => Self::new(code, message),
        }
    }
}

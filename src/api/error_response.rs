//! HTTP error response handling for the API
//!
//! This module provides conversions from domain errors to HTTP responses
//! with appropriate status codes and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Errors with a known status go through Error::into_response instead
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_into_response() {
        let response = Error::validation("n", "must be at least 10000").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "validation_error");
        assert!(api_error.error.message.contains("10000"));
        assert_eq!(api_error.error.details.unwrap()["field"], "n");
    }

    #[tokio::test]
    async fn test_job_not_found_into_response() {
        let id = TaskId::new();
        let response = Error::JobNotFound(id).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "job_not_found");
        assert!(api_error.error.message.contains(&id.to_string()));
    }

    #[tokio::test]
    async fn test_shutting_down_into_response() {
        let response = Error::ShuttingDown.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_of(response).await.error.code, "shutting_down");
    }

    #[tokio::test]
    async fn test_api_error_defaults_to_internal_server_error() {
        let response = ApiError::new("internal_error", "oops").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! Job submission and status handlers.

use super::SubmitJobResponse;
use crate::api::AppState;
use crate::config::OrchestratorConfig;
use crate::error::{ApiError, Error, Result};
use crate::types::TaskId;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// POST /api/count-primes - Submit a prime counting job
#[utoipa::path(
    post,
    path = "/api/count-primes",
    tag = "jobs",
    request_body = super::CountPrimesRequest,
    responses(
        (status = 202, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Invalid n or chunks", body = ApiError),
        (status = 500, description = "Job could not be scheduled", body = ApiError),
        (status = 503, description = "Server is shutting down", body = ApiError)
    )
)]
pub async fn count_primes(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return Error::validation("body", rejection.body_text()).into_response();
        }
    };

    let (n, chunks) = match parse_count_request(&body, &state.config.orchestrator) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected count request");
            return e.into_response();
        }
    };

    match state.counter.submit(n, chunks).await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })).into_response(),
        Err(e) => {
            tracing::error!(n, chunks, error = %e, "Failed to submit job");
            e.into_response()
        }
    }
}

/// GET /api/jobs/:job_id - Get job status
#[utoipa::path(
    get,
    path = "/api/jobs/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job id returned on submission")
    ),
    responses(
        (status = 200, description = "Current job status", body = crate::types::JobStatus),
        (status = 404, description = "Unknown job id", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    let Ok(id) = job_id.parse::<TaskId>() else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiError::with_details(
                "job_not_found",
                format!("job {} not found", job_id),
                serde_json::json!({ "job_id": job_id }),
            )),
        )
            .into_response();
    };

    match state.counter.job_status(id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e @ Error::JobNotFound(_)) => e.into_response(),
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to resolve job status");
            e.into_response()
        }
    }
}

/// Validate a raw submission body against the configured limits
///
/// Both fields must be JSON integers; floats, strings and booleans are
/// rejected rather than coerced.
fn parse_count_request(body: &Value, limits: &OrchestratorConfig) -> Result<(u64, u32)> {
    if !body.is_object() {
        return Err(Error::validation("body", "must be a JSON object"));
    }

    let n = integer_field(body, "n")?;
    if n < i128::from(limits.min_n) {
        return Err(Error::validation(
            "n",
            format!("must be at least {}", limits.min_n),
        ));
    }
    let n = u64::try_from(n).map_err(|_| Error::validation("n", "is too large"))?;

    let chunks = integer_field(body, "chunks")?;
    if !(1..=i128::from(limits.max_chunks)).contains(&chunks) {
        return Err(Error::validation(
            "chunks",
            format!("must be between 1 and {}", limits.max_chunks),
        ));
    }
    let chunks = u32::try_from(chunks)
        .map_err(|_| Error::validation("chunks", "is out of range"))?;

    Ok((n, chunks))
}

fn integer_field(body: &Value, field: &'static str) -> Result<i128> {
    match body.get(field) {
        None | Some(Value::Null) => Err(Error::validation(field, "is required")),
        Some(value) => value
            .as_i64()
            .map(i128::from)
            .or_else(|| value.as_u64().map(i128::from))
            .ok_or_else(|| Error::validation(field, "must be an integer")),
    }
}

//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Job submission and status polling
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

use crate::types::JobId;

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /api/count-primes
///
/// Documents the accepted shape. The handler reads the body as raw JSON so
/// type mismatches are reported as validation errors.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CountPrimesRequest {
    /// Upper bound of the range `[1, n]` (at least 10000)
    #[schema(minimum = 10000, example = 100000)]
    pub n: u64,
    /// Number of sub-ranges counted in parallel (1 to 128)
    #[schema(minimum = 1, maximum = 128, example = 8)]
    pub chunks: u32,
}

/// Response for POST /api/count-primes
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobResponse {
    /// Id to poll at `GET /api/jobs/{job_id}`
    pub job_id: JobId,
}

//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the prime-counter REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the prime-counter REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/docs` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prime Counter API",
        version = "0.1.0",
        description = "Submit prime counting jobs that fan out over parallel workers, then poll them for progress and results",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        crate::api::routes::count_primes,
        crate::api::routes::get_job_status,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::JobState,
        crate::types::JobStatus,
        crate::types::JobResult,
        crate::types::Progress,
        crate::types::TaskId,
        crate::api::routes::CountPrimesRequest,
        crate::api::routes::SubmitJobResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Prime counting jobs - submit and poll"),
        (name = "system", description = "System endpoints - health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;

//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting prime counting
//! jobs and polling their status.

use crate::{Config, PrimeCounter, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /api/count-primes` - Submit a counting job (202 with `{job_id}`)
/// - `GET /api/jobs/:job_id` - Poll job state, progress and result
///
/// ## System
/// - `GET /` and `GET /health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /docs` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(counter: Arc<PrimeCounter>, config: Arc<Config>) -> Router {
    let state = AppState::new(counter, config.clone());

    let router = Router::new()
        // Jobs
        .route("/api/count-primes", post(routes::count_primes))
        .route("/api/jobs/:job_id", get(routes::get_job_status))
        // System
        .route("/", get(routes::health_check))
        .route("/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the document so the routes never overlap
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/docs").url("/docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops, either due to an error or because the
/// surrounding task was aborted.
///
/// # Example
///
/// ```no_run
/// use prime_counter::{Config, PrimeCounter};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let counter = Arc::new(PrimeCounter::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// prime_counter::api::start_api_server(counter, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(counter: Arc<PrimeCounter>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(counter, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

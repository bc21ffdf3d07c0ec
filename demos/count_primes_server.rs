//! REST API server demo
//!
//! Runs prime-counter with the REST API enabled.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/docs
//! - Submit a job via POST http://localhost:8000/api/count-primes
//! - Poll a job via GET http://localhost:8000/api/jobs/{job_id}
//!
//! Set `RUST_LOG=prime_counter=debug` for more detail.

use std::sync::Arc;

use prime_counter::config::{Config, StoreBackend};
use prime_counter::{PrimeCounter, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prime_counter=info,tower_http=info")),
        )
        .init();

    let mut config = Config::default();
    config.persistence.backend = StoreBackend::Sqlite;
    config.persistence.database_path = "prime-counter.db".into();
    config.server.api.cors_origins = vec!["*".to_string()];

    let counter = Arc::new(PrimeCounter::new(config).await?);
    let server = counter.spawn_api_server();

    println!("Prime Counter API: http://localhost:8000");
    println!("Swagger UI:        http://localhost:8000/docs");
    println!();
    println!("Example commands:");
    println!("  curl -X POST http://localhost:8000/api/count-primes \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"n\": 1000000, \"chunks\": 8}}'");
    println!();
    println!("  curl http://localhost:8000/api/jobs/<job_id>");
    println!();
    println!("Press Ctrl+C to stop");

    run_with_shutdown((*counter).clone()).await?;
    server.abort();

    Ok(())
}

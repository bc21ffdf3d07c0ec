//! # prime-counter
//!
//! Prime counting service built on fan-out/fan-in job orchestration.
//!
//! A job counts the primes in `[1, n]`. The range is split into up to 128
//! contiguous chunks that are counted in parallel; a one-shot join sums the
//! chunk counts once every chunk has finished. Clients submit jobs and poll
//! their status over a small REST API.
//!
//! ## Components
//!
//! - [`partition`] - splits `[1, n]` into `k` ordered sub-ranges
//! - [`worker`] - counts primes in one sub-range
//! - [`store`] / [`db`] - task bookkeeping (in-memory or SQLite)
//! - [`orchestrator`] - fan-out and join scheduling
//! - [`executor`] - runs chunks on a bounded worker pool and fires joins
//! - [`resolver`] - derives the externally visible job status
//! - [`api`] - axum router
//!
//! ## Quick Start
//!
//! ```no_run
//! use prime_counter::{Config, PrimeCounter, JobState};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let counter = PrimeCounter::new(Config::default()).await?;
//!     let job_id = counter.submit(100_000, 8).await?;
//!
//!     loop {
//!         let status = counter.job_status(job_id).await?;
//!         if matches!(status.state, JobState::Success | JobState::Failure) {
//!             println!("{:?}", status.result);
//!             break;
//!         }
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!     }
//!
//!     counter.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// SQLite persistence layer
pub mod db;
/// Error types
pub mod error;
/// Chunk and join execution
pub mod executor;
/// Job submission
pub mod orchestrator;
/// Range partitioning
pub mod partition;
/// Task registry
pub mod registry;
/// Job status derivation
pub mod resolver;
/// The assembled service (decomposed into focused submodules)
pub mod service;
/// Task store abstraction
pub mod store;
/// Core types
pub mod types;
/// Prime counting workers
pub mod worker;

// Re-export commonly used types
pub use config::{Config, StoreBackend};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use orchestrator::JobOrchestrator;
pub use partition::partition;
pub use resolver::StatusResolver;
pub use service::PrimeCounter;
pub use store::{JobStore, MemoryStore};
pub use types::{JobId, JobResult, JobState, JobStatus, Progress, SubRange, TaskId};
pub use worker::{RangeWorker, TrialDivisionWorker};

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use prime_counter::{Config, PrimeCounter, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let counter = PrimeCounter::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(counter).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(counter: PrimeCounter) -> Result<()> {
    wait_for_signal().await;
    counter.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    let handlers = ShutdownSignals::register();
    if handlers.is_empty() {
        tracing::error!("No signal handlers registered, falling back to ctrl_c");
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
        return;
    }
    let received = handlers.recv().await;
    tracing::info!(signal = received, "Shutdown signal received");
}

/// SIGTERM and SIGINT listeners; either may be missing in restricted
/// environments
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Option<tokio::signal::unix::Signal>,
    sigint: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn register() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let listen = |kind: SignalKind, name: &'static str| match signal(kind) {
            Ok(handler) => Some(handler),
            Err(e) => {
                tracing::warn!(signal = name, error = %e, "Could not register signal handler");
                None
            }
        };

        Self {
            sigterm: listen(SignalKind::terminate(), "SIGTERM"),
            sigint: listen(SignalKind::interrupt(), "SIGINT"),
        }
    }

    fn is_empty(&self) -> bool {
        self.sigterm.is_none() && self.sigint.is_none()
    }

    /// Name of the first signal delivered
    async fn recv(self) -> &'static str {
        async fn next(handler: Option<tokio::signal::unix::Signal>) {
            match handler {
                Some(mut handler) => {
                    handler.recv().await;
                }
                None => std::future::pending().await,
            }
        }

        tokio::select! {
            _ = next(self.sigterm) => "SIGTERM",
            _ = next(self.sigint) => "SIGINT",
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}

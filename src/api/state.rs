//! Application state for the API server

use crate::{Config, PrimeCounter};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// The service handling submissions and status polls
    pub counter: Arc<PrimeCounter>,

    /// Configuration, read for request validation limits
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(counter: Arc<PrimeCounter>, config: Arc<Config>) -> Self {
        Self { counter, config }
    }
}

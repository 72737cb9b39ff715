//! Application state for Axum handlers.

use genbridge_runtime::{GenerationClient, MetricsServer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Wait API used by the generate handler
    pub client: GenerationClient,
    /// Cancelled when the server shuts down; in-flight waits end with 503
    pub shutdown: CancellationToken,
    /// Prometheus renderer for `GET /metrics`, if installed
    pub metrics: Option<Arc<MetricsServer>>,
}

impl AppState {
    /// Create state around a generation client.
    #[must_use]
    pub fn new(client: GenerationClient, shutdown: CancellationToken) -> Self {
        Self {
            client,
            shutdown,
            metrics: None,
        }
    }

    /// Serve Prometheus metrics from this server.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsServer>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

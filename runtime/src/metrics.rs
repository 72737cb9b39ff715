//! Prometheus metrics for the generation bridge.
//!
//! Covers the wait API (requests, outcomes, wait latency), the correlation
//! tracker (pending count) and the response consumer (message dispositions,
//! poll errors).
//!
//! # Example
//!
//! ```rust,no_run
//! use genbridge_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! let body = server.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the scrape endpoint is served on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// The scrape endpoint address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe all metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// A second installation in the same process (e.g. in tests) is logged
    /// and ignored; [`render`](Self::render) then returns `None`.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!(
                        "Metrics recorder already initialized, skipping re-initialization"
                    );
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "generation_requests_total",
        "Generation requests accepted by the wait API"
    );
    describe_counter!(
        "generation_results_total",
        "Wait API outcomes, labelled by outcome"
    );
    describe_histogram!(
        "generation_wait_duration_seconds",
        "Time from registration to result"
    );

    describe_gauge!(
        "tracker_pending_requests",
        "Requests currently awaiting a response"
    );

    describe_counter!(
        "consumer_messages_total",
        "Response messages processed, labelled by disposition"
    );
    describe_counter!(
        "consumer_poll_errors_total",
        "Failed receive calls on the response queue"
    );
}

/// Wait API metrics recorder.
pub struct GenerationMetrics;

impl GenerationMetrics {
    /// Record an accepted request.
    pub fn record_request() {
        counter!("generation_requests_total").increment(1);
    }

    /// Record a finished wait.
    pub fn record_result(outcome: &'static str, elapsed: Duration) {
        counter!("generation_results_total", "outcome" => outcome).increment(1);
        histogram!("generation_wait_duration_seconds").record(elapsed.as_secs_f64());
    }
}

/// Tracker metrics recorder.
pub struct TrackerMetrics;

impl TrackerMetrics {
    /// Record the number of pending requests.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_pending(pending: usize) {
        gauge!("tracker_pending_requests").set(pending as f64);
    }
}

/// Consumer metrics recorder.
pub struct ConsumerMetrics;

impl ConsumerMetrics {
    /// Record one processed message.
    pub fn record_message(disposition: &'static str) {
        counter!("consumer_messages_total", "disposition" => disposition).increment(1);
    }

    /// Record a failed poll.
    pub fn record_poll_error() {
        counter!("consumer_poll_errors_total").increment(1);
    }
}

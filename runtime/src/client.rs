//! Caller-facing wait API.
//!
//! [`GenerationClient::generate_and_wait`] is what request handlers call:
//! register a fresh correlation id, publish the request, and park until the
//! response arrives, the deadline passes, or the caller cancels.

use crate::metrics::GenerationMetrics;
use crate::tracker::CorrelationTracker;
use genbridge_core::{CorrelationId, GeneratedFile, GenerationError, RequestPublisher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Default wait deadline (5 minutes).
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Synchronous-looking facade over the tracker and the publisher.
///
/// Cheap to clone; clones share the same tracker and publisher.
#[derive(Clone)]
pub struct GenerationClient {
    tracker: Arc<CorrelationTracker>,
    publisher: Arc<dyn RequestPublisher>,
    default_timeout: Duration,
}

impl GenerationClient {
    /// Create a client over a shared tracker and publisher.
    #[must_use]
    pub fn new(tracker: Arc<CorrelationTracker>, publisher: Arc<dyn RequestPublisher>) -> Self {
        Self {
            tracker,
            publisher,
            default_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Override the deadline used by [`generate`](Self::generate).
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The tracker this client registers requests with.
    #[must_use]
    pub const fn tracker(&self) -> &Arc<CorrelationTracker> {
        &self.tracker
    }

    /// The deadline used by [`generate`](Self::generate).
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// [`generate_and_wait`](Self::generate_and_wait) with the default deadline.
    ///
    /// # Errors
    ///
    /// See [`generate_and_wait`](Self::generate_and_wait).
    pub async fn generate(
        &self,
        file_ids: Vec<String>,
        requester_id: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedFile, GenerationError> {
        self.generate_and_wait(file_ids, requester_id, self.default_timeout, cancel)
            .await
    }

    /// Publish a generation request and wait for its result.
    ///
    /// File ids are de-duplicated, keeping first-seen order. A caller whose
    /// `cancel` has already fired is turned away before anything is
    /// registered or published. If publishing fails, the registration is
    /// rolled back and nothing is awaited.
    /// Dropping the returned future also rolls back the registration.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::InvalidRequest`] if `file_ids` or `requester_id` is empty
    /// - [`GenerationError::PublishFailed`] if the request could not be sent
    /// - [`GenerationError::WorkerFailure`] if the worker reported a failure
    /// - [`GenerationError::Timeout`] if no response arrived within `timeout`
    /// - [`GenerationError::Cancelled`] if `cancel` fired before a response arrived
    /// - [`GenerationError::Released`] if the tracker was cleaned up (shutdown)
    pub async fn generate_and_wait(
        &self,
        file_ids: Vec<String>,
        requester_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<GeneratedFile, GenerationError> {
        let file_ids = dedup_file_ids(file_ids);
        if file_ids.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "file_ids is required".to_string(),
            ));
        }
        if requester_id.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "requester id is required".to_string(),
            ));
        }

        let correlation_id = CorrelationId::new();
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled(correlation_id));
        }

        let slot = self.tracker.register(correlation_id.clone())?;
        GenerationMetrics::record_request();

        let started = Instant::now();
        let outcome = match self
            .publisher
            .publish_generate_request(&file_ids, requester_id, slot.correlation_id())
            .await
        {
            Ok(()) => self.tracker.wait(slot, timeout, cancel).await,
            Err(e) => {
                drop(slot);
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Publish failed, pending request rolled back"
                );
                Err(e)
            }
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        GenerationMetrics::record_result(label, started.elapsed());

        match &outcome {
            Ok(file) => tracing::info!(
                correlation_id = %correlation_id,
                requester_id,
                file_id = %file.file_id,
                elapsed_ms = started.elapsed().as_millis(),
                "Generation completed"
            ),
            Err(e) => tracing::info!(
                correlation_id = %correlation_id,
                requester_id,
                outcome = label,
                error = %e,
                "Generation did not complete"
            ),
        }

        outcome
    }
}

fn dedup_file_ids(file_ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(file_ids.len());
    file_ids
        .into_iter()
        .filter(|id| !id.trim().is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

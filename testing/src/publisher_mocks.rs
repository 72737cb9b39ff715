//! Request publisher doubles.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use genbridge_core::{CorrelationId, GenerationError, GenerationRequest, RequestPublisher};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Publisher whose every attempt fails with [`GenerationError::PublishFailed`].
#[derive(Debug, Default)]
pub struct FailingPublisher {
    attempts: AtomicUsize,
}

impl FailingPublisher {
    /// Create a new failing publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish attempts so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl RequestPublisher for FailingPublisher {
    fn publish_generate_request(
        &self,
        _file_ids: &[String],
        _requester_id: &str,
        _correlation_id: &CorrelationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), GenerationError>> + Send + '_>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {
            Err(GenerationError::PublishFailed(
                "request queue unavailable".to_string(),
            ))
        })
    }
}

/// Publisher that records every request and never delivers it anywhere.
///
/// Tests complete the recorded correlation ids themselves.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    response_destination: String,
    published: Mutex<Vec<GenerationRequest>>,
}

impl RecordingPublisher {
    /// Create a recorder that stamps `response_destination` on every request.
    #[must_use]
    pub fn new(response_destination: impl Into<String>) -> Self {
        Self {
            response_destination: response_destination.into(),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Requests published so far.
    #[must_use]
    pub fn published(&self) -> Vec<GenerationRequest> {
        self.published.lock().unwrap().clone()
    }

    /// Correlation id of the most recent request.
    #[must_use]
    pub fn last_correlation_id(&self) -> Option<CorrelationId> {
        self.published
            .lock()
            .unwrap()
            .last()
            .map(|request| request.correlation_id.clone())
    }
}

impl RequestPublisher for RecordingPublisher {
    fn publish_generate_request(
        &self,
        file_ids: &[String],
        requester_id: &str,
        correlation_id: &CorrelationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), GenerationError>> + Send + '_>> {
        self.published.lock().unwrap().push(GenerationRequest {
            file_ids: file_ids.to_vec(),
            requester_id: requester_id.to_string(),
            correlation_id: correlation_id.clone(),
            response_destination: self.response_destination.clone(),
        });
        Box::pin(async { Ok(()) })
    }
}

//! # Genbridge Testing
//!
//! Testing utilities for the generation bridge.
//!
//! This crate provides:
//! - [`InMemoryQueue`]: visibility-timeout queue without AWS
//! - [`FailingPublisher`] and [`RecordingPublisher`]: publisher doubles
//! - [`FakeWorker`]: scripted worker that answers requests
//! - Wire helpers for building and decoding envelopes
//!
//! ## Example
//!
//! ```ignore
//! use genbridge_testing::{FakeWorker, InMemoryQueue, WorkerReply};
//!
//! let queue = Arc::new(InMemoryQueue::new());
//! let shutdown = CancellationToken::new();
//! FakeWorker::new(queue.clone(), "requests").spawn(
//!     |request| WorkerReply::Succeed {
//!         file_id: request.file_ids[0].clone(),
//!         key: "generated/key".into(),
//!     },
//!     shutdown.clone(),
//! );
//! ```

use genbridge_core::{GenerationRequest, GenerationResponse};

/// In-memory queue
pub mod queue_mocks;

/// Publisher doubles
pub mod publisher_mocks;

/// Scripted worker
pub mod worker;

pub use publisher_mocks::{FailingPublisher, RecordingPublisher};
pub use queue_mocks::InMemoryQueue;
pub use worker::{FakeWorker, WorkerReply};

/// Decode a published request body, `None` if it is not a request envelope.
#[must_use]
pub fn decode_request(body: &str) -> Option<GenerationRequest> {
    serde_json::from_str(body).ok()
}

/// Wire body of a successful response.
#[must_use]
pub fn success_body(request_id: &str, file_id: &str, key: &str) -> String {
    response_body(&GenerationResponse {
        correlation_id: request_id.into(),
        file_id: file_id.to_string(),
        key: key.to_string(),
        success: true,
        error: None,
    })
}

/// Wire body of a failed response.
#[must_use]
pub fn failure_body(request_id: &str, error: Option<&str>) -> String {
    response_body(&GenerationResponse {
        correlation_id: request_id.into(),
        file_id: String::new(),
        key: String::new(),
        success: false,
        error: error.map(str::to_string),
    })
}

fn response_body(response: &GenerationResponse) -> String {
    serde_json::to_string(response).unwrap_or_default()
}

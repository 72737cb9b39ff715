//! Error taxonomy for generation request/response correlation.

use crate::correlation::CorrelationId;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the tracker, publisher, consumer and wait API.
///
/// Only `Timeout`, `Cancelled`, `Released`, `PublishFailed`, `WorkerFailure`
/// and `InvalidRequest` ever reach a caller of the wait API. `NotFound` and
/// `MalformedResponse` are consumed inside the response consumer, and
/// `DuplicateRequest` indicates a reused id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The correlation id is already registered
    #[error("Correlation id '{0}' is already registered")]
    DuplicateRequest(CorrelationId),

    /// No pending request exists for the correlation id
    ///
    /// Expected when the waiter already timed out or was cancelled.
    #[error("No pending request for correlation id '{0}'")]
    NotFound(CorrelationId),

    /// No response arrived before the deadline
    #[error("Timed out after {timeout:?} waiting for response to '{correlation_id}'")]
    Timeout {
        /// The request that timed out
        correlation_id: CorrelationId,
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The caller gave up before a response arrived
    #[error("Request '{0}' was cancelled")]
    Cancelled(CorrelationId),

    /// The pending slot was released (tracker cleanup on shutdown)
    #[error("Request '{0}' was released before a response arrived")]
    Released(CorrelationId),

    /// The request could not be serialized or sent
    #[error("Failed to publish generation request: {0}")]
    PublishFailed(String),

    /// The external worker reported a failure
    #[error("Generation failed: {0}")]
    WorkerFailure(String),

    /// A response payload could not be decoded
    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    /// The request was rejected before it was registered
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    /// Whether the caller may reasonably retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::PublishFailed(_))
    }

    /// Whether this is the "waiter already left" outcome of a completion.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Short stable label, used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateRequest(_) => "duplicate_request",
            Self::NotFound(_) => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled(_) => "cancelled",
            Self::Released(_) => "released",
            Self::PublishFailed(_) => "publish_failed",
            Self::WorkerFailure(_) => "worker_failure",
            Self::MalformedResponse(_) => "malformed_response",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

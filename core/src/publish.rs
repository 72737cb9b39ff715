//! Seams between the wait API, the publisher and the consumer loop.

use crate::correlation::CorrelationId;
use crate::envelope::GenerationResult;
use crate::error::GenerationError;
use std::future::Future;
use std::pin::Pin;

/// Publishes generation requests to the worker.
///
/// Implementations build the [`GenerationRequest`](crate::GenerationRequest)
/// envelope, including the response destination, and enqueue it.
pub trait RequestPublisher: Send + Sync {
    /// Publish a request for `file_ids` on behalf of `requester_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::PublishFailed`] on serialization or transport failure.
    fn publish_generate_request(
        &self,
        file_ids: &[String],
        requester_id: &str,
        correlation_id: &CorrelationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), GenerationError>> + Send + '_>>;
}

/// Receives decoded results from the consumer loop.
///
/// The correlation tracker is the production implementation.
pub trait CompletionSink: Send + Sync {
    /// Deliver `result` to whoever waits on `correlation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotFound`] when nobody waits for the id any
    /// more (a terminal outcome for the message). Any other error means
    /// delivery could not be completed and the message should be retried.
    fn complete(
        &self,
        correlation_id: &CorrelationId,
        result: GenerationResult,
    ) -> Result<(), GenerationError>;
}

//! Outbound publisher for generation requests.

use genbridge_core::{
    CorrelationId, GenerationError, GenerationRequest, MessageQueue, RequestPublisher,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Publishes [`GenerationRequest`] envelopes to the request queue.
///
/// Stateless apart from its configuration; every request names the response
/// queue so the worker knows where to answer.
#[derive(Clone)]
pub struct QueuePublisher {
    queue: Arc<dyn MessageQueue>,
    request_queue_url: String,
    response_queue_url: String,
}

impl QueuePublisher {
    /// Create a publisher for the given request/response queue pair.
    #[must_use]
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        request_queue_url: impl Into<String>,
        response_queue_url: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            request_queue_url: request_queue_url.into(),
            response_queue_url: response_queue_url.into(),
        }
    }

    /// The queue requests are sent to.
    #[must_use]
    pub fn request_queue_url(&self) -> &str {
        &self.request_queue_url
    }

    /// The response destination written into every request.
    #[must_use]
    pub fn response_queue_url(&self) -> &str {
        &self.response_queue_url
    }
}

impl RequestPublisher for QueuePublisher {
    fn publish_generate_request(
        &self,
        file_ids: &[String],
        requester_id: &str,
        correlation_id: &CorrelationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), GenerationError>> + Send + '_>> {
        let request = GenerationRequest {
            file_ids: file_ids.to_vec(),
            requester_id: requester_id.to_string(),
            correlation_id: correlation_id.clone(),
            response_destination: self.response_queue_url.clone(),
        };

        Box::pin(async move {
            let body = request.to_json()?;

            self.queue
                .send(&self.request_queue_url, &body)
                .await
                .map_err(|e| {
                    tracing::error!(
                        correlation_id = %request.correlation_id,
                        queue = %self.request_queue_url,
                        error = %e,
                        "Failed to publish generation request"
                    );
                    GenerationError::PublishFailed(e.to_string())
                })?;

            tracing::debug!(
                correlation_id = %request.correlation_id,
                requester_id = %request.requester_id,
                file_count = request.file_ids.len(),
                queue = %self.request_queue_url,
                "Generation request published"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbridge_core::ReceiveOptions;
    use genbridge_testing::InMemoryQueue;
    use std::time::Duration;

    const REQUESTS: &str = "requests";
    const RESPONSES: &str = "responses";

    #[tokio::test]
    async fn publishes_envelope_with_response_destination() {
        let queue = Arc::new(InMemoryQueue::new());
        let publisher = QueuePublisher::new(queue.clone(), REQUESTS, RESPONSES);

        let result = publisher
            .publish_generate_request(
                &["F1".to_string(), "F2".to_string()],
                "U1",
                &CorrelationId::from("R1"),
            )
            .await;
        assert_eq!(result, Ok(()));

        let options = ReceiveOptions {
            wait_time: Duration::ZERO,
            ..ReceiveOptions::default()
        };
        let messages = queue.receive(REQUESTS, &options).await.unwrap_or_default();
        assert_eq!(messages.len(), 1);

        let request = genbridge_testing::decode_request(&messages[0].body);
        assert_eq!(
            request,
            Some(GenerationRequest {
                file_ids: vec!["F1".to_string(), "F2".to_string()],
                requester_id: "U1".to_string(),
                correlation_id: CorrelationId::from("R1"),
                response_destination: RESPONSES.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn transport_failure_becomes_publish_failed() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.fail_sends(true);
        let publisher = QueuePublisher::new(queue.clone(), REQUESTS, RESPONSES);

        let result = publisher
            .publish_generate_request(&["F1".to_string()], "U1", &CorrelationId::from("R1"))
            .await;

        assert!(matches!(result, Err(GenerationError::PublishFailed(_))));
        assert_eq!(queue.len(REQUESTS), 0);
    }
}

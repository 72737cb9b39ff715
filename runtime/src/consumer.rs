//! Response queue consumer loop.
//!
//! A single long-running task drains the response queue for the lifetime of
//! the process and resolves each response against a [`CompletionSink`]
//! (normally the [`CorrelationTracker`](crate::tracker::CorrelationTracker)).
//!
//! # Per-message policy
//!
//! | Outcome | Action |
//! |---------|--------|
//! | Body does not decode | delete, never retried |
//! | `complete` succeeds | delete |
//! | `complete` says `NotFound` (waiter gone) | delete |
//! | any other `complete` error | keep for redelivery, unless `receive_count > max_receive_count`, then delete |
//!
//! # Delivery Semantics
//!
//! **At-least-once, best effort**: a response can be processed more than once
//! if deleting it fails after completion (the replay then sees `NotFound`),
//! but it is never dropped while its waiter is registered and the receive
//! ceiling has not been reached.

use crate::metrics::ConsumerMetrics;
use crate::retry::BackoffPolicy;
use genbridge_core::{
    CompletionSink, GenerationResponse, MessageQueue, QueueError, QueueMessage, ReceiveOptions,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consumer loop configuration.
///
/// # Default Values
///
/// - `receive`: 10 messages, 20 s long poll, 30 s visibility timeout
/// - `max_receive_count`: 3 (a message is dropped on its 4th failed delivery)
/// - `backoff`: [`BackoffPolicy::default`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfig {
    /// Parameters for each long poll
    pub receive: ReceiveOptions,
    /// Poison ceiling: messages received more often than this are dropped
    pub max_receive_count: u32,
    /// Pause between failed polls
    pub backoff: BackoffPolicy,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            receive: ReceiveOptions::default(),
            max_receive_count: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// What happened to a single received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Delivered to its waiter and deleted
    Completed,
    /// No waiter any more; deleted
    Orphaned,
    /// Undecodable; deleted
    Malformed,
    /// Delivery failed; left for redelivery
    Retained,
    /// Delivery failed too many times; deleted
    PoisonDropped,
}

impl MessageDisposition {
    /// Whether the message was deleted from the queue (or deletion was attempted).
    #[must_use]
    pub const fn is_acknowledged(self) -> bool {
        !matches!(self, Self::Retained)
    }

    /// Metric label for this disposition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Orphaned => "orphaned",
            Self::Malformed => "malformed",
            Self::Retained => "retained",
            Self::PoisonDropped => "poison_dropped",
        }
    }
}

/// Drains the response queue and resolves responses by correlation id.
///
/// # Example
///
/// ```rust,ignore
/// let consumer = ResponseConsumer::new(queue, response_queue_url, tracker.clone(), ConsumerConfig::default());
/// let shutdown = CancellationToken::new();
/// let handle = consumer.spawn(shutdown.clone());
///
/// // ... later
/// shutdown.cancel();
/// handle.await?;
/// ```
pub struct ResponseConsumer {
    queue: Arc<dyn MessageQueue>,
    queue_url: String,
    sink: Arc<dyn CompletionSink>,
    config: ConsumerConfig,
}

impl ResponseConsumer {
    /// Create a consumer for `queue_url`.
    #[must_use]
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        queue_url: impl Into<String>,
        sink: Arc<dyn CompletionSink>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            queue_url: queue_url.into(),
            sink,
            config,
        }
    }

    /// The consumer's configuration.
    #[must_use]
    pub const fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Run the loop on a new tokio task until `shutdown` is cancelled.
    #[must_use]
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run the loop until `shutdown` is cancelled.
    ///
    /// Individual message failures and queue errors never end the loop.
    /// Failed polls back off according to [`ConsumerConfig::backoff`]. A
    /// receive still waiting when `shutdown` fires is abandoned. Messages
    /// already received are completed and acknowledged before the loop
    /// exits.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            queue = %self.queue_url,
            max_messages = self.config.receive.max_messages,
            wait_secs = self.config.receive.wait_time.as_secs(),
            visibility_secs = self.config.receive.visibility_timeout.as_secs(),
            max_receive_count = self.config.max_receive_count,
            "Starting response consumer"
        );

        let mut consecutive_failures = 0usize;

        loop {
            let received = tokio::select! {
                () = shutdown.cancelled() => break,
                received = self.queue.receive(&self.queue_url, &self.config.receive) => received,
            };

            match received {
                Ok(messages) => {
                    consecutive_failures = 0;
                    self.process_batch(messages).await;
                }
                Err(e) => {
                    let delay = self.config.backoff.jittered_delay(consecutive_failures);
                    consecutive_failures += 1;
                    ConsumerMetrics::record_poll_error();
                    warn!(
                        queue = %self.queue_url,
                        error = %e,
                        consecutive_failures,
                        delay_ms = delay.as_millis(),
                        "Error receiving messages, backing off"
                    );

                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!(queue = %self.queue_url, "Response consumer shutting down");
    }

    /// Perform one long poll and process everything it returned.
    ///
    /// # Errors
    ///
    /// Returns the queue error if the receive call itself fails.
    pub async fn poll_once(&self) -> Result<Vec<MessageDisposition>, QueueError> {
        let messages = self
            .queue
            .receive(&self.queue_url, &self.config.receive)
            .await?;
        Ok(self.process_batch(messages).await)
    }

    async fn process_batch(&self, messages: Vec<QueueMessage>) -> Vec<MessageDisposition> {
        let mut dispositions = Vec::with_capacity(messages.len());
        for message in messages {
            dispositions.push(self.process_message(message).await);
        }
        dispositions
    }

    /// Decode one message, complete its request, and acknowledge per policy.
    pub async fn process_message(&self, message: QueueMessage) -> MessageDisposition {
        let disposition = self.resolve(&message).await;
        ConsumerMetrics::record_message(disposition.as_str());
        disposition
    }

    async fn resolve(&self, message: &QueueMessage) -> MessageDisposition {
        let response = match GenerationResponse::from_json(&message.body) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    message_id = ?message.message_id,
                    error = %e,
                    "Dropping undecodable generation response"
                );
                self.acknowledge(message).await;
                return MessageDisposition::Malformed;
            }
        };

        let correlation_id = response.correlation_id.clone();
        debug!(
            correlation_id = %correlation_id,
            success = response.success,
            receive_count = message.receive_count,
            "Received generation response"
        );

        match self.sink.complete(&correlation_id, response.into_result()) {
            Ok(()) => {
                self.acknowledge(message).await;
                MessageDisposition::Completed
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    correlation_id = %correlation_id,
                    "No waiter for generation response, discarding"
                );
                self.acknowledge(message).await;
                MessageDisposition::Orphaned
            }
            Err(e) if message.receive_count > self.config.max_receive_count => {
                warn!(
                    correlation_id = %correlation_id,
                    receive_count = message.receive_count,
                    error = %e,
                    "Message received too many times, deleting to prevent infinite redelivery"
                );
                self.acknowledge(message).await;
                MessageDisposition::PoisonDropped
            }
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    receive_count = message.receive_count,
                    error = %e,
                    "Failed to complete generation request, leaving message for redelivery"
                );
                MessageDisposition::Retained
            }
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) {
        if let Err(e) = self
            .queue
            .delete(&self.queue_url, &message.receipt_handle)
            .await
        {
            warn!(
                message_id = ?message.message_id,
                error = %e,
                "Failed to delete message (it may be redelivered)"
            );
        }
    }
}

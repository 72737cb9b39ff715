//! Message queue abstraction for the request and response queues.
//!
//! This module provides the [`MessageQueue`] trait: the three transport
//! operations the correlation subsystem needs from a visibility-timeout queue
//! (SQS semantics).
//!
//! # Delivery Semantics
//!
//! - **At-least-once**: a received message stays in the queue until it is
//!   deleted with its receipt handle
//! - **Visibility timeout**: a received message is hidden from other consumers
//!   for a window, then becomes visible again if not deleted
//! - **Receive count**: every message carries an approximate count of how
//!   many times it has been received, used to drop poison messages
//!
//! # Implementations
//!
//! - `SqsMessageQueue` in `genbridge-sqs` - For production (AWS SQS)
//! - `InMemoryQueue` in `genbridge-testing` - For testing
//!
//! # Example
//!
//! ```rust,ignore
//! use genbridge_core::queue::{MessageQueue, ReceiveOptions};
//!
//! async fn drain(queue: &dyn MessageQueue, url: &str) -> Result<(), QueueError> {
//!     for message in queue.receive(url, &ReceiveOptions::default()).await? {
//!         println!("{} (attempt {})", message.body, message.receive_count);
//!         queue.delete(url, &message.receipt_handle).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during queue operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Failed to create or configure the queue client
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to send a message
    #[error("Send failed for queue '{queue}': {reason}")]
    SendFailed {
        /// The queue that failed
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to receive messages
    #[error("Receive failed for queue '{queue}': {reason}")]
    ReceiveFailed {
        /// The queue that failed
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to delete (acknowledge) a message
    #[error("Delete failed for queue '{queue}': {reason}")]
    DeleteFailed {
        /// The queue that failed
        queue: String,
        /// The reason for failure
        reason: String,
    },
}

/// A message received from a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message id (for logging)
    pub message_id: Option<String>,
    /// Message body
    pub body: String,
    /// Handle used to delete this particular receipt
    pub receipt_handle: String,
    /// Approximate number of times the message has been received (>= 1)
    pub receive_count: u32,
}

/// Parameters for a single receive (long-poll) call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Maximum number of messages to return
    pub max_messages: u32,
    /// How long to wait for messages before returning empty
    pub wait_time: Duration,
    /// How long received messages stay hidden from other consumers
    pub visibility_timeout: Duration,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time: Duration::from_secs(20),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

/// Trait for visibility-timeout message queue implementations.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` so it can be used as `Arc<dyn MessageQueue>` by the publisher
/// and the consumer loop.
pub trait MessageQueue: Send + Sync {
    /// Send a message body to a queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::SendFailed`] if the message could not be enqueued.
    fn send(
        &self,
        queue_url: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QueueError>> + Send + '_>>;

    /// Long-poll a queue for up to `options.max_messages` messages.
    ///
    /// Returns an empty vector if nothing arrives within `options.wait_time`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ReceiveFailed`] on transport failure.
    fn receive(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<QueueMessage>, QueueError>> + Send + '_>>;

    /// Delete (acknowledge) a received message.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::DeleteFailed`] if the message could not be deleted.
    fn delete(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QueueError>> + Send + '_>>;
}

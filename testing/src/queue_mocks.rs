//! In-memory message queue for fast, deterministic tests.
//!
//! [`InMemoryQueue`] keeps the visibility-timeout semantics of SQS: received
//! messages are hidden for the visibility window, come back with an
//! incremented receive count if not deleted, and disappear only when deleted
//! with the receipt handle of their latest delivery.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use genbridge_core::{MessageQueue, QueueError, QueueMessage, ReceiveOptions};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// How often a long poll re-checks for messages.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug)]
struct StoredMessage {
    message_id: String,
    body: String,
    receive_count: u32,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|until| until <= now)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    queues: HashMap<String, Vec<StoredMessage>>,
    fail_sends: bool,
    failing_receives: usize,
    failing_deletes: usize,
    deleted: usize,
}

/// In-memory [`MessageQueue`] with visibility timeouts and receive counts.
///
/// Queues are created on first use and are keyed by URL.
///
/// # Example
///
/// ```
/// use genbridge_core::{MessageQueue, ReceiveOptions};
/// use genbridge_testing::InMemoryQueue;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = InMemoryQueue::new();
/// queue.send("jobs", "hello").await?;
///
/// let options = ReceiveOptions { wait_time: Duration::ZERO, ..ReceiveOptions::default() };
/// let messages = queue.receive("jobs", &options).await?;
/// assert_eq!(messages[0].receive_count, 1);
///
/// queue.delete("jobs", &messages[0].receipt_handle).await?;
/// assert_eq!(queue.len("jobs"), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
}

impl InMemoryQueue {
    /// Create a new empty queue set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    /// Make the next `count` calls to `receive` fail.
    pub fn fail_next_receives(&self, count: usize) {
        self.state.lock().unwrap().failing_receives = count;
    }

    /// Make the next `count` calls to `delete` fail, leaving the messages in place.
    pub fn fail_next_deletes(&self, count: usize) {
        self.state.lock().unwrap().failing_deletes = count;
    }

    /// Number of messages in a queue, visible or in flight.
    #[must_use]
    pub fn len(&self, queue_url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue_url)
            .map_or(0, Vec::len)
    }

    /// Whether a queue holds no messages at all.
    #[must_use]
    pub fn is_empty(&self, queue_url: &str) -> bool {
        self.len(queue_url) == 0
    }

    /// Total number of successful deletes across all queues.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.state.lock().unwrap().deleted
    }

    /// Bodies of every message in a queue, in send order.
    #[must_use]
    pub fn bodies(&self, queue_url: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue_url)
            .map(|messages| messages.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    /// End the visibility window of every in-flight message in a queue.
    pub fn make_visible(&self, queue_url: &str) {
        if let Some(messages) = self.state.lock().unwrap().queues.get_mut(queue_url) {
            for message in messages {
                message.invisible_until = None;
            }
        }
    }

    fn take_visible(&self, queue_url: &str, options: &ReceiveOptions) -> Vec<QueueMessage> {
        let mut state = self.state.lock().unwrap();
        let Some(messages) = state.queues.get_mut(queue_url) else {
            return Vec::new();
        };

        let now = Instant::now();
        messages
            .iter_mut()
            .filter(|m| m.is_visible(now))
            .take(options.max_messages as usize)
            .map(|m| {
                let handle = uuid::Uuid::new_v4().to_string();
                m.receive_count += 1;
                m.receipt_handle = Some(handle.clone());
                m.invisible_until = Some(now + options.visibility_timeout);
                QueueMessage {
                    message_id: Some(m.message_id.clone()),
                    body: m.body.clone(),
                    receipt_handle: handle,
                    receive_count: m.receive_count,
                }
            })
            .collect()
    }
}

impl MessageQueue for InMemoryQueue {
    fn send(
        &self,
        queue_url: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QueueError>> + Send + '_>> {
        let queue_url = queue_url.to_string();
        let body = body.to_string();

        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.fail_sends {
                return Err(QueueError::SendFailed {
                    queue: queue_url,
                    reason: "send failure injected".to_string(),
                });
            }

            state.queues.entry(queue_url).or_default().push(StoredMessage {
                message_id: uuid::Uuid::new_v4().to_string(),
                body,
                receive_count: 0,
                receipt_handle: None,
                invisible_until: None,
            });
            Ok(())
        })
    }

    fn receive(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<QueueMessage>, QueueError>> + Send + '_>> {
        let queue_url = queue_url.to_string();
        let options = options.clone();

        Box::pin(async move {
            {
                let mut state = self.state.lock().unwrap();
                if state.failing_receives > 0 {
                    state.failing_receives -= 1;
                    return Err(QueueError::ReceiveFailed {
                        queue: queue_url,
                        reason: "receive failure injected".to_string(),
                    });
                }
            }

            let deadline = Instant::now() + options.wait_time;
            loop {
                let messages = self.take_visible(&queue_url, &options);
                let now = Instant::now();
                if !messages.is_empty() || now >= deadline {
                    return Ok(messages);
                }
                tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
            }
        })
    }

    fn delete(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QueueError>> + Send + '_>> {
        let queue_url = queue_url.to_string();
        let receipt_handle = receipt_handle.to_string();

        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.failing_deletes > 0 {
                state.failing_deletes -= 1;
                return Err(QueueError::DeleteFailed {
                    queue: queue_url,
                    reason: "delete failure injected".to_string(),
                });
            }

            let removed = state.queues.get_mut(&queue_url).and_then(|messages| {
                messages
                    .iter()
                    .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle.as_str()))
                    .map(|index| messages.remove(index))
            });

            if removed.is_none() {
                return Err(QueueError::DeleteFailed {
                    queue: queue_url,
                    reason: format!("unknown receipt handle '{receipt_handle}'"),
                });
            }
            state.deleted += 1;
            Ok(())
        })
    }
}

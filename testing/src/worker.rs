//! Scripted stand-in for the external generation worker.
//!
//! [`FakeWorker`] drains a request queue, asks a responder what to do with
//! each [`GenerationRequest`], and sends the reply to the request's
//! `response_destination`.

use crate::InMemoryQueue;
use genbridge_core::{GenerationRequest, MessageQueue, ReceiveOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the fake worker does with one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerReply {
    /// Respond with a successful result
    Succeed {
        /// Generated file id
        file_id: String,
        /// Object-store key
        key: String,
    },
    /// Respond with a failure, optionally without a message
    Fail(Option<String>),
    /// Respond with an arbitrary body
    Raw(String),
    /// Never respond
    Ignore,
}

/// Scripted worker over an [`InMemoryQueue`].
pub struct FakeWorker {
    queue: Arc<InMemoryQueue>,
    request_queue_url: String,
    delay: Duration,
}

impl FakeWorker {
    /// Create a worker that serves `request_queue_url`.
    #[must_use]
    pub fn new(queue: Arc<InMemoryQueue>, request_queue_url: impl Into<String>) -> Self {
        Self {
            queue,
            request_queue_url: request_queue_url.into(),
            delay: Duration::ZERO,
        }
    }

    /// Wait this long before answering each request.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve requests on a new task until `shutdown` is cancelled.
    pub fn spawn<F>(self, responder: F, shutdown: CancellationToken) -> JoinHandle<()>
    where
        F: Fn(&GenerationRequest) -> WorkerReply + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            let options = ReceiveOptions {
                max_messages: 10,
                wait_time: Duration::from_millis(50),
                visibility_timeout: Duration::from_secs(30),
            };

            loop {
                let received = tokio::select! {
                    () = shutdown.cancelled() => break,
                    received = self.queue.receive(&self.request_queue_url, &options) => received,
                };

                for message in received.unwrap_or_default() {
                    let _ = self
                        .queue
                        .delete(&self.request_queue_url, &message.receipt_handle)
                        .await;

                    let Some(request) = crate::decode_request(&message.body) else {
                        continue;
                    };
                    let body = match responder(&request) {
                        WorkerReply::Succeed { file_id, key } => {
                            crate::success_body(request.correlation_id.as_str(), &file_id, &key)
                        }
                        WorkerReply::Fail(error) => {
                            crate::failure_body(request.correlation_id.as_str(), error.as_deref())
                        }
                        WorkerReply::Raw(body) => body,
                        WorkerReply::Ignore => continue,
                    };

                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    let _ = self.queue.send(&request.response_destination, &body).await;
                }
            }
        })
    }
}

//! AWS SQS message queue for genbridge.
//!
//! This crate provides the production [`MessageQueue`] used for both the
//! request queue and the response queue. It uses the official AWS SDK
//! (`aws-sdk-sqs`) with the default credential chain.
//!
//! # Delivery Semantics
//!
//! **At-least-once** with visibility timeouts:
//! - A received message is hidden for the visibility timeout and reappears
//!   if it is not deleted
//! - The `ApproximateReceiveCount` system attribute is requested on every
//!   receive and exposed as [`QueueMessage::receive_count`]
//! - Deletes use the receipt handle of the latest delivery
//!
//! # Example
//!
//! ```no_run
//! use genbridge_core::{MessageQueue, ReceiveOptions};
//! use genbridge_sqs::SqsMessageQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = SqsMessageQueue::builder()
//!     .region("ap-southeast-1")
//!     .build()
//!     .await;
//!
//! let url = queue.resolve_queue_url("openexam-dev-queue").await?;
//! queue.send(&url, r#"{"hello":"world"}"#).await?;
//!
//! for message in queue.receive(&url, &ReceiveOptions::default()).await? {
//!     queue.delete(&url, &message.receipt_handle).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client as SqsClient;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use genbridge_core::{MessageQueue, QueueError, QueueMessage, ReceiveOptions};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// SQS-backed message queue.
///
/// Cheap to clone; clones share the underlying SDK client.
#[derive(Clone, Debug)]
pub struct SqsMessageQueue {
    client: SqsClient,
}

impl SqsMessageQueue {
    /// Create a new builder for configuring the queue client.
    #[must_use]
    pub fn builder() -> SqsMessageQueueBuilder {
        SqsMessageQueueBuilder::default()
    }

    /// Wrap an existing SDK client (for tests or custom configuration).
    #[must_use]
    pub const fn from_client(client: SqsClient) -> Self {
        Self { client }
    }

    /// Turn a queue name into a queue URL.
    ///
    /// Values that already look like URLs are returned unchanged, so both
    /// `openexam-dev-queue` and `https://sqs.../openexam-dev-queue` work in
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ConnectionFailed`] if the queue does not exist
    /// or cannot be looked up.
    pub async fn resolve_queue_url(&self, name_or_url: &str) -> Result<String, QueueError> {
        if is_queue_url(name_or_url) {
            return Ok(name_or_url.to_string());
        }

        let output = self
            .client
            .get_queue_url()
            .queue_name(name_or_url)
            .send()
            .await
            .map_err(|err| {
                QueueError::ConnectionFailed(format!(
                    "Failed to resolve queue '{name_or_url}': {}",
                    DisplayErrorContext(&err)
                ))
            })?;

        let url = output.queue_url().map(str::to_string).ok_or_else(|| {
            QueueError::ConnectionFailed(format!("No URL returned for queue '{name_or_url}'"))
        })?;

        tracing::info!(queue = %name_or_url, url = %url, "Resolved queue URL");
        Ok(url)
    }
}

/// Builder for configuring a [`SqsMessageQueue`].
///
/// # Example
///
/// ```no_run
/// use genbridge_sqs::SqsMessageQueue;
///
/// # async fn example() {
/// // LocalStack
/// let queue = SqsMessageQueue::builder()
///     .region("us-east-1")
///     .endpoint_url("http://localhost:4566")
///     .build()
///     .await;
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SqsMessageQueueBuilder {
    region: Option<String>,
    endpoint_url: Option<String>,
}

impl SqsMessageQueueBuilder {
    /// Set the AWS region. Without it the SDK's default provider chain decides.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Override the SQS endpoint (e.g. LocalStack).
    #[must_use]
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Load the AWS configuration and build the queue client.
    pub async fn build(self) -> SqsMessageQueue {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        tracing::info!(
            region = self.region.as_deref().unwrap_or("<default chain>"),
            endpoint_url = self.endpoint_url.as_deref().unwrap_or("<default>"),
            "SqsMessageQueue created"
        );

        SqsMessageQueue::from_client(SqsClient::new(&sdk_config))
    }
}

impl MessageQueue for SqsMessageQueue {
    fn send(
        &self,
        queue_url: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), QueueError>> + Send + '_>> {
        let queue_url = queue_url.to_string();
        let body = body.to_string();

        Box::pin(async move {
            let output = self
                .client
                .send_message()
                .queue_url(&queue_url)
                .message_body(body)
                .send()
                .await
                .map_err(|err| QueueError::SendFailed {
                    queue: queue_url.clone(),
                    reason: DisplayErrorContext(&err).to_string(),
                })?;

            tracing::debug!(
                queue = %queue_url,
                message_id = output.message_id().unwrap_or_default(),
                "Message sent"
            );
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
            let output = self
                .client
                .receive_message()
                .queue_url(&queue_url)
                .max_number_of_messages(clamp_to_i32(u64::from(options.max_messages)))
                .wait_time_seconds(whole_seconds(options.wait_time))
                .visibility_timeout(whole_seconds(options.visibility_timeout))
                .message_system_attribute_names(
                    MessageSystemAttributeName::ApproximateReceiveCount,
                )
                .send()
                .await
                .map_err(|err| QueueError::ReceiveFailed {
                    queue: queue_url.clone(),
                    reason: DisplayErrorContext(&err).to_string(),
                })?;

            let messages: Vec<QueueMessage> = output
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(into_queue_message)
                .collect();

            if !messages.is_empty() {
                tracing::debug!(queue = %queue_url, count = messages.len(), "Messages received");
            }
            Ok(messages)
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
            self.client
                .delete_message()
                .queue_url(&queue_url)
                .receipt_handle(receipt_handle)
                .send()
                .await
                .map_err(|err| QueueError::DeleteFailed {
                    queue: queue_url,
                    reason: DisplayErrorContext(&err).to_string(),
                })?;
            Ok(())
        })
    }
}

/// Convert an SDK message, skipping ones without a body or receipt handle.
fn into_queue_message(message: Message) -> Option<QueueMessage> {
    let receive_count = parse_receive_count(message.attributes());
    let Message {
        message_id,
        receipt_handle,
        body,
        ..
    } = message;

    let (Some(body), Some(receipt_handle)) = (body, receipt_handle) else {
        tracing::warn!(
            message_id = ?message_id,
            "Skipping message without body or receipt handle"
        );
        return None;
    };

    Some(QueueMessage {
        message_id,
        body,
        receipt_handle,
        receive_count,
    })
}

/// `ApproximateReceiveCount`, or 1 when missing or unparsable.
fn parse_receive_count(attributes: Option<&HashMap<MessageSystemAttributeName, String>>) -> u32 {
    attributes
        .and_then(|attributes| attributes.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.trim().parse().ok())
        .unwrap_or(1)
}

fn is_queue_url(name_or_url: &str) -> bool {
    name_or_url.starts_with("https://") || name_or_url.starts_with("http://")
}

fn whole_seconds(duration: Duration) -> i32 {
    clamp_to_i32(duration.as_secs())
}

fn clamp_to_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

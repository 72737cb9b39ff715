//! # Genbridge Runtime
//!
//! Runtime for bridging synchronous callers onto an asynchronous worker
//! queue.
//!
//! ## Core Components
//!
//! - **Correlation Tracker**: Pending requests keyed by correlation id, each with a one-shot slot
//! - **Queue Publisher**: Sends generation requests carrying the response destination
//! - **Response Consumer**: Long-polls the response queue and completes waiters
//! - **Generation Client**: Register, publish, and wait in one call
//!
//! ## Example
//!
//! ```ignore
//! use genbridge_runtime::{
//!     ConsumerConfig, CorrelationTracker, GenerationClient, QueuePublisher, ResponseConsumer,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let tracker = Arc::new(CorrelationTracker::new());
//! let publisher = Arc::new(QueuePublisher::new(queue.clone(), requests_url, responses_url));
//!
//! let shutdown = CancellationToken::new();
//! ResponseConsumer::new(queue, responses_url, tracker.clone(), ConsumerConfig::default())
//!     .spawn(shutdown.clone());
//!
//! let client = GenerationClient::new(tracker, publisher);
//! let file = client.generate(vec!["F1".into()], "U1", &CancellationToken::new()).await?;
//! ```

/// Wait API over tracker and publisher
pub mod client;

/// Environment-driven configuration
pub mod config;

/// Response queue consumer loop
pub mod consumer;

/// Prometheus metrics for observability
pub mod metrics;

/// Outbound request publisher
pub mod publisher;

/// Backoff for failed polls
pub mod retry;

/// Pending-request registry
pub mod tracker;

pub use client::{DEFAULT_GENERATION_TIMEOUT, GenerationClient};
pub use config::{BridgeConfig, ConfigError};
pub use consumer::{ConsumerConfig, MessageDisposition, ResponseConsumer};
pub use metrics::{MetricsError, MetricsServer};
pub use publisher::QueuePublisher;
pub use retry::BackoffPolicy;
pub use tracker::{CorrelationTracker, PendingSlot};

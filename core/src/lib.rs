//! # Genbridge Core
//!
//! Core types and traits for handing generation requests to an external
//! worker over a message queue and correlating the worker's responses back
//! to the callers waiting on them.
//!
//! This crate contains no I/O. It defines:
//!
//! - **Identifiers**: [`CorrelationId`], one per outstanding request
//! - **Wire envelopes**: [`GenerationRequest`] and [`GenerationResponse`] (JSON)
//! - **Results**: [`GenerationResult`] delivered to waiters, [`GeneratedFile`] returned to callers
//! - **Errors**: the [`GenerationError`] taxonomy
//! - **Seams**: [`MessageQueue`], [`RequestPublisher`] and [`CompletionSink`]
//!
//! ## Data Flow
//!
//! ```text
//! caller ──► register(id) ──► publish(request) ──► request queue ──► worker
//!   ▲                                                                  │
//!   │                                                                  ▼
//!   └──── slot ◄── complete(id, result) ◄── consumer ◄── response queue
//! ```
//!
//! Implementations live in `genbridge-runtime` (tracker, publisher, consumer),
//! `genbridge-sqs` (production queue) and `genbridge-testing` (in-memory queue).

pub mod correlation;
pub mod envelope;
pub mod error;
pub mod publish;
pub mod queue;

pub use correlation::CorrelationId;
pub use envelope::{GeneratedFile, GenerationRequest, GenerationResponse, GenerationResult};
pub use error::GenerationError;
pub use publish::{CompletionSink, RequestPublisher};
pub use queue::{MessageQueue, QueueError, QueueMessage, ReceiveOptions};

//! In-memory correlation tracker.
//!
//! The tracker maps a [`CorrelationId`] to a one-shot delivery slot. A caller
//! registers an id, publishes its request, then parks in [`CorrelationTracker::wait`]
//! until the response consumer calls [`CorrelationTracker::complete`] for the
//! same id, the deadline elapses, or the caller cancels.
//!
//! # Guarantees
//!
//! - At most one value is delivered per id: `complete` removes the entry
//!   before sending, so a second `complete` sees `NotFound`
//! - The registry is never locked across an `.await`
//! - Every path out of `wait` (delivery, timeout, cancellation, or the wait
//!   future being dropped) removes the entry, and removal is idempotent
//! - [`CorrelationTracker::cleanup`] releases every waiter with
//!   [`GenerationError::Released`]
//!
//! # Implementation
//!
//! Uses `DashMap` so registration and completion of unrelated ids do not
//! contend on a single lock. Slots are `tokio::sync::oneshot` channels.

use crate::metrics::TrackerMetrics;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use genbridge_core::{
    CompletionSink, CorrelationId, GeneratedFile, GenerationError, GenerationResult,
};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Registry of pending generation requests.
///
/// Single-process and in-memory: if the process restarts, pending requests
/// are lost and must be resubmitted by their callers.
///
/// # Example
///
/// ```
/// use genbridge_core::{CorrelationId, GenerationResult};
/// use genbridge_runtime::tracker::CorrelationTracker;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = CorrelationTracker::new();
/// let id = CorrelationId::from("R1");
///
/// let slot = tracker.register(id.clone())?;
/// tracker.complete(&id, GenerationResult::success("F1", "K1"))?;
///
/// let file = tracker
///     .wait(slot, Duration::from_secs(1), &CancellationToken::new())
///     .await?;
/// assert_eq!(file.key, "K1");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CorrelationTracker {
    pending: DashMap<CorrelationId, oneshot::Sender<GenerationResult>>,
}

/// The read side of a pending request, owned by the waiting caller.
///
/// Dropping the slot (without waiting, or by dropping the future that waits
/// on it) removes its registry entry.
#[derive(Debug)]
pub struct PendingSlot<'a> {
    tracker: &'a CorrelationTracker,
    correlation_id: CorrelationId,
    receiver: oneshot::Receiver<GenerationResult>,
}

impl PendingSlot<'_> {
    /// The correlation id this slot waits for.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.tracker.release(&self.correlation_id);
    }
}

impl CorrelationTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending request and return its slot.
    ///
    /// The entry is visible to [`complete`](Self::complete) immediately.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::DuplicateRequest`] if `correlation_id` is
    /// already registered.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
    ) -> Result<PendingSlot<'_>, GenerationError> {
        let receiver = match self.pending.entry(correlation_id.clone()) {
            Entry::Occupied(_) => {
                return Err(GenerationError::DuplicateRequest(correlation_id));
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = oneshot::channel();
                entry.insert(sender);
                receiver
            }
        };

        self.record_pending();
        debug!(correlation_id = %correlation_id, "Registered pending generation request");

        Ok(PendingSlot {
            tracker: self,
            correlation_id,
            receiver,
        })
    }

    /// Deliver `result` to the waiter registered under `correlation_id`.
    ///
    /// The entry is removed before delivery, so at most one value is ever
    /// delivered per id.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NotFound`] if no entry exists (the waiter
    /// already timed out, was cancelled, or the id was completed before) or
    /// if the waiter dropped its slot concurrently.
    pub fn complete(
        &self,
        correlation_id: &CorrelationId,
        result: GenerationResult,
    ) -> Result<(), GenerationError> {
        let Some((_, sender)) = self.pending.remove(correlation_id) else {
            return Err(GenerationError::NotFound(correlation_id.clone()));
        };
        self.record_pending();

        sender.send(result).map_err(|_| {
            debug!(correlation_id = %correlation_id, "Waiter left before delivery");
            GenerationError::NotFound(correlation_id.clone())
        })
    }

    /// Wait for the slot's result, the deadline, or cancellation.
    ///
    /// A value that is already delivered is returned without waiting.
    /// The registry entry is removed on every exit path.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::WorkerFailure`] if the delivered result carries an error
    /// - [`GenerationError::Timeout`] if `timeout` elapses first
    /// - [`GenerationError::Cancelled`] if `cancel` fires first
    /// - [`GenerationError::Released`] if the slot was released by [`cleanup`](Self::cleanup)
    pub async fn wait(
        &self,
        mut slot: PendingSlot<'_>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<GeneratedFile, GenerationError> {
        let correlation_id = slot.correlation_id.clone();

        tokio::select! {
            biased;

            delivered = &mut slot.receiver => match delivered {
                Ok(result) => result.into_outcome(),
                Err(_) => Err(GenerationError::Released(correlation_id)),
            },
            () = cancel.cancelled() => {
                debug!(correlation_id = %correlation_id, "Wait cancelled by caller");
                Err(GenerationError::Cancelled(correlation_id))
            },
            () = tokio::time::sleep(timeout) => {
                debug!(
                    correlation_id = %correlation_id,
                    timeout_ms = timeout.as_millis(),
                    "Wait timed out"
                );
                Err(GenerationError::Timeout { correlation_id, timeout })
            },
        }
        // `slot` drops here and removes any remaining entry.
    }

    /// Remove the entry for `correlation_id` without delivering anything.
    ///
    /// Returns `true` if an entry was removed. Idempotent.
    pub fn release(&self, correlation_id: &CorrelationId) -> bool {
        let removed = self.pending.remove(correlation_id).is_some();
        if removed {
            self.record_pending();
        }
        removed
    }

    /// Release every pending slot. Outstanding waiters observe
    /// [`GenerationError::Released`].
    ///
    /// Returns the number of slots released.
    pub fn cleanup(&self) -> usize {
        let ids: Vec<CorrelationId> = self
            .pending
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let released = ids.iter().filter(|id| self.release(id)).count();

        info!(released, "Released all pending generation requests");
        released
    }

    /// Whether `correlation_id` is currently registered.
    #[must_use]
    pub fn contains(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn record_pending(&self) {
        TrackerMetrics::record_pending(self.pending.len());
    }
}

impl CompletionSink for CorrelationTracker {
    fn complete(
        &self,
        correlation_id: &CorrelationId,
        result: GenerationResult,
    ) -> Result<(), GenerationError> {
        Self::complete(self, correlation_id, result)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{EventId, OutboxError, OutboxEvent, Result};

/// Parameters for claiming a batch of pending events.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    /// Maximum number of events to claim.
    pub limit: usize,

    /// Identifies the claiming projector instance.
    pub claimer: String,

    /// How long the claim hides the events from other instances.
    pub lease: Duration,
}

impl ClaimRequest {
    /// Creates a claim request with a 30 second lease.
    pub fn new(limit: usize, claimer: impl Into<String>) -> Self {
        Self {
            limit,
            claimer: claimer.into(),
            lease: Duration::from_secs(30),
        }
    }

    /// Sets the lease duration.
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

/// Storage boundary of the outbox table.
///
/// All implementations must be thread-safe (Send + Sync). Pending events are
/// always returned oldest first (`created_at`, then id).
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Appends a new pending event.
    async fn append(&self, event: OutboxEvent) -> Result<()>;

    /// Loads a single event.
    async fn get(&self, id: EventId) -> Result<Option<OutboxEvent>>;

    /// Returns up to `limit` pending events without claiming them.
    async fn fetch_undispatched(&self, limit: usize) -> Result<Vec<OutboxEvent>>;

    /// Claims up to `request.limit` pending events that no live claim holds.
    ///
    /// Each claimed event has its `attempts` counter incremented. Concurrent
    /// callers never receive the same event while its lease is live.
    async fn claim_batch(&self, request: &ClaimRequest) -> Result<Vec<OutboxEvent>>;

    /// Sets `dispatched_at` on a pending event.
    ///
    /// Returns `false` without touching the row if the event was already
    /// dispatched, so `dispatched_at` is written exactly once.
    async fn mark_dispatched(&self, id: EventId, at: DateTime<Utc>) -> Result<bool>;

    /// Drops the claim on a failed event so the next poll retries it.
    async fn release(&self, id: EventId, error: &str) -> Result<()>;

    /// Parks an event permanently; it is never claimed again.
    async fn dead_letter(&self, id: EventId, error: &str) -> Result<()>;

    /// Number of events still waiting for the projector.
    async fn pending_count(&self) -> Result<u64>;
}

/// Validates an event before it is appended.
pub fn validate_for_append(event: &OutboxEvent) -> Result<()> {
    if event.event_type.trim().is_empty() {
        return Err(OutboxError::InvalidEvent(
            "event_type must not be empty".to_string(),
        ));
    }
    if event.dispatched_at.is_some() || event.failed_at.is_some() {
        return Err(OutboxError::InvalidEvent(format!(
            "event {} must be pending when appended",
            event.id
        )));
    }
    Ok(())
}

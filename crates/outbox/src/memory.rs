use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    EventId, OutboxError, OutboxEvent, Result,
    store::{ClaimRequest, OutboxStore, validate_for_append},
};

#[derive(Debug, Clone)]
struct StoredEvent {
    event: OutboxEvent,
    claimed_by: Option<String>,
    claimed_until: Option<DateTime<Utc>>,
}

impl StoredEvent {
    fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.event.is_pending() && self.claimed_until.is_none_or(|until| until < now)
    }
}

/// In-memory outbox for testing.
///
/// Mirrors the PostgreSQL ordering and claim semantics: pending events come
/// back oldest first (insertion order breaks ties) and a live claim hides an
/// event from other claimers.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    events: Arc<RwLock<Vec<StoredEvent>>>,
}

impl InMemoryOutboxStore {
    /// Creates a new empty in-memory outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored, dispatched or not.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns every stored event in insertion order.
    pub async fn all_events(&self) -> Vec<OutboxEvent> {
        self.events
            .read()
            .await
            .iter()
            .map(|stored| stored.event.clone())
            .collect()
    }

    /// Returns the claimer currently holding the event, if any.
    pub async fn claimed_by(&self, id: EventId) -> Option<String> {
        self.events
            .read()
            .await
            .iter()
            .find(|stored| stored.event.id == id)
            .and_then(|stored| stored.claimed_by.clone())
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }

    fn pending_sorted(events: &[StoredEvent]) -> Vec<usize> {
        let mut indexes: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, stored)| stored.event.is_pending())
            .map(|(i, _)| i)
            .collect();
        indexes.sort_by_key(|&i| events[i].event.created_at);
        indexes
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn append(&self, event: OutboxEvent) -> Result<()> {
        validate_for_append(&event)?;

        let mut events = self.events.write().await;
        if events.iter().any(|stored| stored.event.id == event.id) {
            return Err(OutboxError::InvalidEvent(format!(
                "event {} already exists",
                event.id
            )));
        }

        events.push(StoredEvent {
            event,
            claimed_by: None,
            claimed_until: None,
        });
        Ok(())
    }

    async fn get(&self, id: EventId) -> Result<Option<OutboxEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .find(|stored| stored.event.id == id)
            .map(|stored| stored.event.clone()))
    }

    async fn fetch_undispatched(&self, limit: usize) -> Result<Vec<OutboxEvent>> {
        let events = self.events.read().await;
        Ok(Self::pending_sorted(&events)
            .into_iter()
            .take(limit)
            .map(|i| events[i].event.clone())
            .collect())
    }

    async fn claim_batch(&self, request: &ClaimRequest) -> Result<Vec<OutboxEvent>> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(request.lease)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));

        let mut events = self.events.write().await;
        let claimable: Vec<usize> = Self::pending_sorted(&events)
            .into_iter()
            .filter(|&i| events[i].is_claimable(now))
            .take(request.limit)
            .collect();

        let mut claimed = Vec::with_capacity(claimable.len());
        for i in claimable {
            let stored = &mut events[i];
            stored.claimed_by = Some(request.claimer.clone());
            stored.claimed_until = Some(now + lease);
            stored.event.attempts += 1;
            claimed.push(stored.event.clone());
        }

        Ok(claimed)
    }

    async fn mark_dispatched(&self, id: EventId, at: DateTime<Utc>) -> Result<bool> {
        let mut events = self.events.write().await;
        let stored = events
            .iter_mut()
            .find(|stored| stored.event.id == id)
            .ok_or(OutboxError::NotFound(id))?;

        if stored.event.dispatched_at.is_some() {
            return Ok(false);
        }

        stored.event.dispatched_at = Some(at);
        stored.claimed_by = None;
        stored.claimed_until = None;
        Ok(true)
    }

    async fn release(&self, id: EventId, error: &str) -> Result<()> {
        let mut events = self.events.write().await;
        let stored = events
            .iter_mut()
            .find(|stored| stored.event.id == id)
            .ok_or(OutboxError::NotFound(id))?;

        stored.claimed_by = None;
        stored.claimed_until = None;
        stored.event.last_error = Some(error.to_string());
        Ok(())
    }

    async fn dead_letter(&self, id: EventId, error: &str) -> Result<()> {
        let mut events = self.events.write().await;
        let stored = events
            .iter_mut()
            .find(|stored| stored.event.id == id)
            .ok_or(OutboxError::NotFound(id))?;

        if stored.event.dispatched_at.is_none() {
            stored.event.failed_at = Some(Utc::now());
            stored.claimed_by = None;
            stored.claimed_until = None;
            stored.event.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|stored| stored.event.is_pending()).count() as u64)
    }
}

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an outbox event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EventId> for Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// A row of the outbox table.
///
/// Everything except the delivery bookkeeping (`dispatched_at`, `attempts`,
/// `last_error`, `failed_at`) is immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Unique identifier for this event.
    pub id: EventId,

    /// Dotted type tag, e.g. `"product.created"` or
    /// `"variant.retail_discount.updated"`.
    pub event_type: String,

    /// JSON payload; its schema is keyed by `event_type`.
    pub payload: serde_json::Value,

    /// The user whose command produced the event.
    pub user_id: Option<UserId>,

    /// When the command service wrote the event.
    pub created_at: DateTime<Utc>,

    /// When the projector finished applying the event. `None` while pending.
    pub dispatched_at: Option<DateTime<Utc>>,

    /// How many times a projector has claimed the event.
    pub attempts: u32,

    /// The error recorded by the most recent failed attempt.
    pub last_error: Option<String>,

    /// When the event was dead-lettered. Dead-lettered events are never claimed again.
    pub failed_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Creates a new outbox event builder.
    pub fn builder() -> OutboxEventBuilder {
        OutboxEventBuilder::default()
    }

    /// Returns true while the event still waits for the projector.
    pub fn is_pending(&self) -> bool {
        self.dispatched_at.is_none() && self.failed_at.is_none()
    }
}

/// Builder for events about to be appended to the outbox.
#[derive(Debug, Default)]
pub struct OutboxEventBuilder {
    id: Option<EventId>,
    event_type: Option<String>,
    payload: Option<serde_json::Value>,
    user_id: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
}

impl OutboxEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the acting user.
    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the creation time. If not set, the current time will be used.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds a pending outbox event.
    ///
    /// # Panics
    ///
    /// Panics if `event_type` or `payload` is not set.
    pub fn build(self) -> OutboxEvent {
        self.try_build()
            .expect("event_type and payload are required")
    }

    /// Tries to build the event, returning None if required fields are missing.
    pub fn try_build(self) -> Option<OutboxEvent> {
        Some(OutboxEvent {
            id: self.id.unwrap_or_default(),
            event_type: self.event_type?,
            payload: self.payload?,
            user_id: self.user_id,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            dispatched_at: None,
            attempts: 0,
            last_error: None,
            failed_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_new_creates_unique_ids() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn builder_produces_pending_event() {
        let user = UserId::new();
        let event = OutboxEvent::builder()
            .event_type("variant.archived")
            .payload_raw(serde_json::json!({"product_id": Uuid::nil()}))
            .user_id(user)
            .build();

        assert_eq!(event.event_type, "variant.archived");
        assert_eq!(event.user_id, Some(user));
        assert_eq!(event.attempts, 0);
        assert!(event.is_pending());
    }

    #[test]
    fn dispatched_or_failed_events_are_not_pending() {
        let mut event = OutboxEvent::builder()
            .event_type("product.archived")
            .payload_raw(serde_json::json!({}))
            .build();

        event.dispatched_at = Some(Utc::now());
        assert!(!event.is_pending());

        event.dispatched_at = None;
        event.failed_at = Some(Utc::now());
        assert!(!event.is_pending());
    }

    #[test]
    fn try_build_returns_none_on_missing_fields() {
        assert!(OutboxEvent::builder().try_build().is_none());
        assert!(
            OutboxEvent::builder()
                .event_type("product.created")
                .try_build()
                .is_none()
        );
    }
}

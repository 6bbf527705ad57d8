//! Core domain event trait.

/// A catalog fact written to the outbox by a command service.
///
/// The tag returned by [`event_type`](DomainEvent::event_type) is what the
/// projector dispatches on; payloads without a registered tag are skipped.
pub trait DomainEvent: Send + Sync + Clone {
    /// Returns the dotted event type tag stored in the outbox.
    fn event_type(&self) -> &'static str;
}

//! Routes outbox events to the registered projectors.

use domain::{CatalogEvent, DomainEvent};
use outbox::OutboxEvent;

use crate::Result;
use crate::projection::Projector;
use crate::store::ReadModelSession;
use crate::views::{IndexProjector, SnapshotProjector};

/// What routing did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Every projector applied the event.
    Applied,
    /// The event type has no registered handler; nothing was written.
    Ignored,
}

/// The aggregate family an event type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Product,
    Variant,
}

impl EventFamily {
    /// Returns the family of a registered event type.
    pub fn of(event_type: &str) -> Option<Self> {
        if !CatalogEvent::is_known(event_type) {
            return None;
        }
        if event_type.starts_with("product.") {
            Some(EventFamily::Product)
        } else {
            Some(EventFamily::Variant)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventFamily::Product => "product",
            EventFamily::Variant => "variant",
        }
    }
}

/// Decodes outbox events and hands them to each projector in registration
/// order.
pub struct Router {
    projectors: Vec<Box<dyn Projector>>,
}

impl Router {
    /// Creates a router with no projectors.
    pub fn new() -> Self {
        Self {
            projectors: Vec::new(),
        }
    }

    /// Creates the production router: snapshot first, then search index.
    pub fn standard() -> Self {
        let mut router = Self::new();
        router.register(Box::new(SnapshotProjector::new()));
        router.register(Box::new(IndexProjector::new()));
        router
    }

    /// Registers a projector after the existing ones.
    pub fn register(&mut self, projector: Box<dyn Projector>) {
        self.projectors.push(projector);
    }

    /// Returns the number of registered projectors.
    pub fn projector_count(&self) -> usize {
        self.projectors.len()
    }

    /// Returns true when `event_type` has a handler.
    pub fn handles(event_type: &str) -> bool {
        CatalogEvent::is_known(event_type)
    }

    /// Routes one outbox event through `session`.
    ///
    /// Unknown event types are logged and ignored. The first projector error
    /// aborts routing and is returned; the caller discards the session.
    #[tracing::instrument(
        skip(self, session, event),
        fields(event_id = %event.id, event_type = %event.event_type)
    )]
    pub async fn route(
        &self,
        session: &mut dyn ReadModelSession,
        event: &OutboxEvent,
    ) -> Result<RouteOutcome> {
        let Some(catalog_event) = CatalogEvent::decode(&event.event_type, &event.payload)? else {
            tracing::warn!("no handler registered for event type");
            metrics::counter!("projector_unknown_events", "event_type" => event.event_type.clone())
                .increment(1);
            return Ok(RouteOutcome::Ignored);
        };

        self.apply(session, &catalog_event).await?;
        Ok(RouteOutcome::Applied)
    }

    /// Applies an already decoded event to every projector.
    pub async fn apply(
        &self,
        session: &mut dyn ReadModelSession,
        event: &CatalogEvent,
    ) -> Result<()> {
        let family = EventFamily::of(event.event_type()).map_or("unknown", |f| f.as_str());
        for projector in &self.projectors {
            projector.apply(&mut *session, event).await?;
            tracing::debug!(projector = projector.name(), family, "event applied");
        }
        Ok(())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::standard()
    }
}

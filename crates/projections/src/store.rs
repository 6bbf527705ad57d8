//! Transactional write access to the read models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outbox::EventId;

use crate::Result;
use crate::change::RowUpdate;
use crate::read_model::{ReadModel, VariantRow};

/// One unit of work against both read models and the outbox.
///
/// Everything written through a session becomes visible together on
/// [`commit`](ReadModelSession::commit). Dropping a session without
/// committing discards its writes.
#[async_trait]
pub trait ReadModelSession: Send {
    /// Inserts rows that do not exist yet; existing keys are left untouched.
    ///
    /// Returns the number of rows actually inserted. For the search index the
    /// search document is seeded from title and description and `views`
    /// starts at zero.
    async fn insert_rows(&mut self, model: ReadModel, rows: &[VariantRow]) -> Result<u64>;

    /// Applies a partial update and returns the number of rows it matched.
    async fn update_rows(&mut self, model: ReadModel, update: &RowUpdate) -> Result<u64>;

    /// Marks the outbox event dispatched as part of this unit of work.
    ///
    /// Returns `false` when the event is already dispatched (or unknown), in
    /// which case the caller must not commit.
    async fn mark_dispatched(&mut self, event_id: EventId, at: DateTime<Utc>) -> Result<bool>;

    /// Makes every write of the session visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Opens read-model sessions.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ReadModelSession>>;
}

//! Snapshot projection: the command path's view of each variant.
//!
//! Ownership, moderation and pricing checks read these rows, so every
//! catalog event is applied verbatim.

use async_trait::async_trait;
use domain::CatalogEvent;

use crate::Result;
use crate::projection::{Projector, change_for, write_change};
use crate::read_model::ReadModel;
use crate::store::ReadModelSession;

/// Maintains `product_variant_snapshots`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotProjector;

impl SnapshotProjector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Projector for SnapshotProjector {
    fn name(&self) -> &'static str {
        "SnapshotProjector"
    }

    fn read_model(&self) -> ReadModel {
        ReadModel::Snapshot
    }

    async fn apply(&self, session: &mut dyn ReadModelSession, event: &CatalogEvent) -> Result<()> {
        write_change(session, ReadModel::Snapshot, change_for(event)).await
    }
}

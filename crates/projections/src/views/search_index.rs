//! Search-index projection: the public feed and search view.
//!
//! Carries the snapshot columns plus a search document over title and
//! description, and a view counter owned by the public read path.

use async_trait::async_trait;
use domain::CatalogEvent;

use crate::Result;
use crate::change::RowChange;
use crate::projection::{Projector, change_for, write_change};
use crate::read_model::ReadModel;
use crate::store::ReadModelSession;

/// Maintains `product_search_index`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexProjector;

impl IndexProjector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Projector for IndexProjector {
    fn name(&self) -> &'static str {
        "IndexProjector"
    }

    fn read_model(&self) -> ReadModel {
        ReadModel::SearchIndex
    }

    async fn apply(&self, session: &mut dyn ReadModelSession, event: &CatalogEvent) -> Result<()> {
        let change = match change_for(event) {
            RowChange::Update(update) => RowChange::Update(update.with_search_refresh()),
            insert => insert,
        };
        write_change(session, ReadModel::SearchIndex, change).await
    }
}

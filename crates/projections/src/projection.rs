//! Core projector trait.

use async_trait::async_trait;
use chrono::Utc;
use domain::CatalogEvent;

use crate::change::{RowChange, RowUpdate};
use crate::read_model::ReadModel;
use crate::store::ReadModelSession;
use crate::{ProjectionError, Result};

/// Applies catalog events to one read model.
///
/// Projectors write through the session they are handed, so every projector
/// routed for an event shares that event's unit of work.
#[async_trait]
pub trait Projector: Send + Sync {
    /// Returns the name of this projector.
    fn name(&self) -> &'static str;

    /// Returns the read model this projector maintains.
    fn read_model(&self) -> ReadModel;

    /// Applies one decoded event.
    async fn apply(&self, session: &mut dyn ReadModelSession, event: &CatalogEvent) -> Result<()>;
}

/// Writes a [`RowChange`] to `model`.
///
/// Inserts skip existing keys. An update that matches no row fails with
/// [`ProjectionError::MissingRow`] so the event is retried instead of lost.
pub(crate) async fn write_change(
    session: &mut dyn ReadModelSession,
    model: ReadModel,
    change: RowChange,
) -> Result<()> {
    match change {
        RowChange::Insert(rows) => {
            let inserted = session.insert_rows(model, &rows).await?;
            if inserted < rows.len() as u64 {
                tracing::debug!(
                    model = %model,
                    skipped = rows.len() as u64 - inserted,
                    "rows already present"
                );
            }
            Ok(())
        }
        RowChange::Update(update) => write_update(session, model, &update).await,
    }
}

async fn write_update(
    session: &mut dyn ReadModelSession,
    model: ReadModel,
    update: &RowUpdate,
) -> Result<()> {
    let matched = session.update_rows(model, update).await?;
    if matched == 0 {
        return Err(ProjectionError::MissingRow {
            model,
            target: update.target.to_string(),
        });
    }
    Ok(())
}

/// Maps `event` to its row change as of now.
pub(crate) fn change_for(event: &CatalogEvent) -> RowChange {
    RowChange::for_event(event, Utc::now())
}

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::ProductId;
use outbox::{EventId, InMemoryOutboxStore, OutboxStore};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::Result;
use crate::change::RowUpdate;
use crate::read_model::{IndexRow, ReadModel, ReadModelReader, RowKey, VariantRow};
use crate::search;
use crate::store::{ReadModelSession, ReadModelStore};

#[derive(Debug, Clone, Default)]
struct Tables {
    snapshots: BTreeMap<RowKey, VariantRow>,
    index: BTreeMap<RowKey, IndexRow>,
}

/// In-memory read models for testing.
///
/// Sessions are serialized: a session holds the tables exclusively from
/// `begin` until it is committed or dropped, works on a private copy and
/// swaps it in on commit. When built with an outbox, dispatch marks are
/// applied to it on commit as well.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    tables: Arc<Mutex<Tables>>,
    outbox: Option<InMemoryOutboxStore>,
}

impl InMemoryReadModelStore {
    /// Creates empty read models with no outbox attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates empty read models that mark events dispatched in `outbox`.
    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            tables: Arc::default(),
            outbox: Some(outbox),
        }
    }

    /// Returns every search-index row ordered by key.
    pub async fn index_rows(&self) -> Vec<IndexRow> {
        self.tables.lock().await.index.values().cloned().collect()
    }

    /// Clears both read models.
    pub async fn clear(&self) {
        let mut tables = self.tables.lock().await;
        tables.snapshots.clear();
        tables.index.clear();
    }
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn begin(&self) -> Result<Box<dyn ReadModelSession>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemorySession {
            guard,
            working,
            outbox: self.outbox.clone(),
            marks: Vec::new(),
        }))
    }
}

#[async_trait]
impl ReadModelReader for InMemoryReadModelStore {
    async fn snapshot(&self, key: RowKey) -> Result<Option<VariantRow>> {
        Ok(self.tables.lock().await.snapshots.get(&key).cloned())
    }

    async fn snapshot_rows(&self, product_id: ProductId) -> Result<Vec<VariantRow>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<VariantRow> = tables
            .snapshots
            .values()
            .filter(|row| row.product_id == product_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.variant_id);
        Ok(rows)
    }

    async fn index_entry(&self, key: RowKey) -> Result<Option<IndexRow>> {
        Ok(self.tables.lock().await.index.get(&key).cloned())
    }

    async fn count(&self, model: ReadModel) -> Result<u64> {
        let tables = self.tables.lock().await;
        let count = match model {
            ReadModel::Snapshot => tables.snapshots.len(),
            ReadModel::SearchIndex => tables.index.len(),
        };
        Ok(count as u64)
    }
}

struct InMemorySession {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    outbox: Option<InMemoryOutboxStore>,
    marks: Vec<(EventId, DateTime<Utc>)>,
}

#[async_trait]
impl ReadModelSession for InMemorySession {
    async fn insert_rows(&mut self, model: ReadModel, rows: &[VariantRow]) -> Result<u64> {
        let mut inserted = 0;
        for row in rows {
            let fresh = match model {
                ReadModel::Snapshot => match self.working.snapshots.entry(row.key()) {
                    Entry::Vacant(slot) => {
                        slot.insert(row.clone());
                        true
                    }
                    Entry::Occupied(_) => false,
                },
                ReadModel::SearchIndex => match self.working.index.entry(row.key()) {
                    Entry::Vacant(slot) => {
                        slot.insert(IndexRow {
                            variant: row.clone(),
                            search_document: search::document(&row.title, &row.description),
                            views: 0,
                        });
                        true
                    }
                    Entry::Occupied(_) => false,
                },
            };
            if fresh {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn update_rows(&mut self, model: ReadModel, update: &RowUpdate) -> Result<u64> {
        let now = Utc::now();
        let mut matched = 0;
        match model {
            ReadModel::Snapshot => {
                for (key, row) in self.working.snapshots.iter_mut() {
                    if update.target.matches(key) {
                        update.apply_to(row, now);
                        matched += 1;
                    }
                }
            }
            ReadModel::SearchIndex => {
                for (key, entry) in self.working.index.iter_mut() {
                    if update.target.matches(key) {
                        update.apply_to(&mut entry.variant, now);
                        if update.refresh_search {
                            entry.search_document =
                                search::document(&entry.variant.title, &entry.variant.description);
                        }
                        matched += 1;
                    }
                }
            }
        }
        Ok(matched)
    }

    async fn mark_dispatched(&mut self, event_id: EventId, at: DateTime<Utc>) -> Result<bool> {
        if self.marks.iter().any(|(id, _)| *id == event_id) {
            return Ok(false);
        }
        if let Some(outbox) = &self.outbox {
            let pending = outbox
                .get(event_id)
                .await?
                .is_some_and(|event| event.dispatched_at.is_none());
            if !pending {
                return Ok(false);
            }
        }
        self.marks.push((event_id, at));
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemorySession {
            mut guard,
            working,
            outbox,
            marks,
        } = *self;

        if let Some(outbox) = outbox {
            for (id, at) in marks {
                outbox.mark_dispatched(id, at).await?;
            }
        }
        *guard = working;
        Ok(())
    }
}

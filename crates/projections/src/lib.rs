//! Catalog projections fed from the transactional outbox.
//!
//! This crate is the heart of the projector service:
//! - [`Dispatcher`] polls the outbox and projects each event in its own unit of work
//! - [`Router`] decodes events and hands them to every registered [`Projector`]
//! - [`SnapshotProjector`] and [`IndexProjector`] maintain the two read models
//! - [`ReadModelStore`] / [`ReadModelSession`] are the transactional write boundary,
//!   implemented by [`PgReadModelStore`] and [`InMemoryReadModelStore`]
//! - [`ReadModelReader`] gives query access to both projections

pub mod change;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod projection;
pub mod read_model;
pub mod router;
pub mod search;
pub mod store;
pub mod views;

pub use change::{RowChange, RowTarget, RowUpdate};
pub use dispatcher::{Dispatcher, DispatcherConfig, TickReport};
pub use error::{ProjectionError, Result};
pub use memory::InMemoryReadModelStore;
pub use postgres::PgReadModelStore;
pub use projection::Projector;
pub use read_model::{IndexRow, ReadModel, ReadModelReader, RowKey, VariantRow};
pub use router::{EventFamily, RouteOutcome, Router};
pub use store::{ReadModelSession, ReadModelStore};
pub use views::{IndexProjector, SnapshotProjector};

//! Outbox access for the projection engine.
//!
//! Command services append an [`OutboxEvent`] in the same transaction as the
//! business mutation that caused it. The projector claims pending events,
//! replays them into the read models and marks them dispatched.
//!
//! - [`OutboxStore`] is the storage boundary
//! - [`PostgresOutboxStore`] is the production implementation
//! - [`InMemoryOutboxStore`] mirrors it for tests

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::UserId;
pub use error::{OutboxError, Result};
pub use event::{EventId, OutboxEvent, OutboxEventBuilder};
pub use memory::InMemoryOutboxStore;
pub use postgres::PostgresOutboxStore;
pub use store::{ClaimRequest, OutboxStore};

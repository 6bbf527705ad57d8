//! Identifier types shared by the outbox, the event payloads and the read models.

pub mod types;

pub use types::{CategoryId, ProductId, SellerId, UserId, VariantId};

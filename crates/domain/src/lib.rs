//! Catalog domain events.
//!
//! Command services emit one outbox row per catalog change. This crate owns
//! the payload schema of every event type and the registry that decodes an
//! `(event_type, payload)` pair into a typed [`CatalogEvent`]:
//! - [`event_types`] lists every tag the projector understands
//! - [`catalog`] holds the payload structs and the [`CatalogEvent`] sum type
//! - [`DecodeError`] separates malformed payloads from transient failures

pub mod catalog;
pub mod error;
pub mod event;
pub mod event_types;

pub use catalog::{
    CatalogEvent, CategorySummary, DiscountType, Money, ProductSummary, SellerSummary,
    VariantDetails,
};
pub use common::{CategoryId, ProductId, SellerId, UserId, VariantId};
pub use error::DecodeError;
pub use event::DomainEvent;

//! Catalog events and the payload schema registry.

pub mod context;
pub mod product;
pub mod value_objects;
pub mod variant;

use serde::de::DeserializeOwned;

pub use context::{CategorySummary, ProductSummary, SellerSummary, VariantDetails};
pub use product::{
    ProductCategoryUpdated, ProductCreated, ProductImageSet, ProductInfoFields,
    ProductInfoUpdated, ProductPromoVideoSet, ProductRef,
};
pub use value_objects::{DiscountType, Money};
pub use variant::{
    InStockUpdated, RetailDiscountAdded, RetailDiscountFields, RetailDiscountUpdated,
    RetailPriceUpdated, StockQuantityUpdated, VariantCreated, VariantInfoFields,
    VariantInfoUpdated, VariantRef, WeightUpdated, WholesaleDiscountAdded,
    WholesaleDiscountFields, WholesaleDiscountUpdated, WholesaleModeEnabled,
    WholesaleModeFields, WholesaleModeUpdated,
};

use crate::event::DomainEvent;
use crate::event_types as types;
use crate::DecodeError;

/// Generates [`CatalogEvent`] together with its registry.
///
/// Each line binds one event type tag to one enum variant and its payload
/// type, so decoding, encoding and the tag lookup can never disagree.
macro_rules! catalog_events {
    ($($(#[$doc:meta])* $variant:ident($payload:ty) => $tag:path,)+) => {
        /// A decoded catalog event, one variant per event type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum CatalogEvent {
            $($(#[$doc])* $variant($payload),)+
        }

        impl CatalogEvent {
            /// Decodes an outbox payload by its event type tag.
            ///
            /// Returns `Ok(None)` for tags this registry does not know, so new
            /// event types emitted by writers never block the queue.
            pub fn decode(
                event_type: &str,
                payload: &serde_json::Value,
            ) -> Result<Option<Self>, DecodeError> {
                let event = match event_type {
                    $($tag => CatalogEvent::$variant(parse(event_type, payload)?),)+
                    _ => return Ok(None),
                };
                event.validate()?;
                Ok(Some(event))
            }

            /// Encodes the payload as stored in `outbox_events.event_payload`.
            pub fn to_payload(&self) -> serde_json::Result<serde_json::Value> {
                match self {
                    $(CatalogEvent::$variant(payload) => serde_json::to_value(payload),)+
                }
            }

            /// Returns true when `event_type` has a registered payload schema.
            pub fn is_known(event_type: &str) -> bool {
                matches!(event_type, $($tag)|+)
            }
        }

        impl DomainEvent for CatalogEvent {
            fn event_type(&self) -> &'static str {
                match self {
                    $(CatalogEvent::$variant(_) => $tag,)+
                }
            }
        }
    };
}

catalog_events! {
    /// A product was listed with its first variants.
    ProductCreated(ProductCreated) => types::PRODUCT_CREATED,
    /// Title and/or description changed.
    ProductInfoUpdated(ProductInfoUpdated) => types::PRODUCT_INFO_UPDATED,
    ProductImageAdded(ProductImageSet) => types::PRODUCT_IMAGE_ADDED,
    ProductImageUpdated(ProductImageSet) => types::PRODUCT_IMAGE_UPDATED,
    ProductImageRemoved(ProductRef) => types::PRODUCT_IMAGE_REMOVED,
    ProductPromoVideoAdded(ProductPromoVideoSet) => types::PRODUCT_PROMO_VIDEO_ADDED,
    ProductPromoVideoUpdated(ProductPromoVideoSet) => types::PRODUCT_PROMO_VIDEO_UPDATED,
    ProductPromoVideoRemoved(ProductRef) => types::PRODUCT_PROMO_VIDEO_REMOVED,
    /// The product moved to another category.
    ProductCategoryUpdated(ProductCategoryUpdated) => types::PRODUCT_CATEGORY_UPDATED,
    /// The seller archived the product; all its variants disappear from public reads.
    ProductArchived(ProductRef) => types::PRODUCT_ARCHIVED,
    /// A variant was added to an existing product.
    VariantCreated(VariantCreated) => types::VARIANT_CREATED,
    VariantArchived(VariantRef) => types::VARIANT_ARCHIVED,
    VariantInfoUpdated(VariantInfoUpdated) => types::VARIANT_INFO_UPDATED,
    InStockUpdated(InStockUpdated) => types::VARIANT_IN_STOCK_UPDATED,
    StockQuantityUpdated(StockQuantityUpdated) => types::VARIANT_STOCK_QUANTITY_UPDATED,
    RetailPriceUpdated(RetailPriceUpdated) => types::VARIANT_RETAIL_PRICE_UPDATED,
    WeightUpdated(WeightUpdated) => types::VARIANT_WEIGHT_UPDATED,
    RetailDiscountAdded(RetailDiscountAdded) => types::VARIANT_RETAIL_DISCOUNT_ADDED,
    RetailDiscountUpdated(RetailDiscountUpdated) => types::VARIANT_RETAIL_DISCOUNT_UPDATED,
    RetailDiscountRemoved(VariantRef) => types::VARIANT_RETAIL_DISCOUNT_REMOVED,
    WholesaleModeEnabled(WholesaleModeEnabled) => types::VARIANT_WHOLESALE_MODE_ENABLED,
    WholesaleModeUpdated(WholesaleModeUpdated) => types::VARIANT_WHOLESALE_MODE_UPDATED,
    /// Wholesale was switched off; price, minimum quantity and discount all go.
    WholesaleModeDisabled(VariantRef) => types::VARIANT_WHOLESALE_MODE_DISABLED,
    WholesaleDiscountAdded(WholesaleDiscountAdded) => types::VARIANT_WHOLESALE_DISCOUNT_ADDED,
    WholesaleDiscountUpdated(WholesaleDiscountUpdated) => types::VARIANT_WHOLESALE_DISCOUNT_UPDATED,
    WholesaleDiscountRemoved(VariantRef) => types::VARIANT_WHOLESALE_DISCOUNT_REMOVED,
}

fn parse<T: DeserializeOwned>(event_type: &str, payload: &serde_json::Value) -> Result<T, DecodeError> {
    T::deserialize(payload).map_err(|source| DecodeError::Malformed {
        event_type: event_type.to_string(),
        source,
    })
}

impl CatalogEvent {
    fn validate(&self) -> Result<(), DecodeError> {
        let invalid = |reason: &str| DecodeError::Invalid {
            event_type: self.event_type().to_string(),
            reason: reason.to_string(),
        };

        match self {
            CatalogEvent::ProductCreated(created) => {
                if created.variants.is_empty() {
                    return Err(invalid("a product needs at least one variant"));
                }
                let mut ids: Vec<_> = created.variants.iter().map(|v| v.variant_id).collect();
                ids.sort();
                ids.dedup();
                if ids.len() != created.variants.len() {
                    return Err(invalid("variant ids must be unique"));
                }
                Ok(())
            }
            CatalogEvent::WholesaleModeEnabled(enabled) => {
                if enabled.wholesale_discount.is_some() != enabled.wholesale_discount_type.is_some()
                {
                    return Err(invalid(
                        "wholesale_discount and wholesale_discount_type go together",
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

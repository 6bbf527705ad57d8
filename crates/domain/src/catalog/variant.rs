//! Variant-level event payloads.
//!
//! Partial updates name only the fields that changed, in `updated_fields`,
//! using the literal column names. Absent and `null` both mean "unchanged".

use common::{ProductId, VariantId};
use serde::{Deserialize, Serialize};

use super::{CategorySummary, DiscountType, Money, ProductSummary, SellerSummary, VariantDetails};

/// Payload of `variant.created`: a new variant on an existing product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantCreated {
    pub seller: SellerSummary,
    pub category: CategorySummary,
    pub product: ProductSummary,
    pub variant: VariantDetails,
}

/// Payload carrying only the row key: archive and removal events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantRef {
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

/// Payload of `variant.info.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInfoUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub updated_fields: VariantInfoFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantInfoFields {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

/// Payload of `variant.in_stock.updated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InStockUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub in_stock: bool,
}

/// Payload of `variant.stock_quantity.updated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockQuantityUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub stock_quantity: i32,
}

/// Payload of `variant.retail_price.updated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetailPriceUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub retail_price: Money,
}

/// Payload of `variant.weight.updated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub weight_grams: i32,
}

/// Payload of `variant.retail_discount.added`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetailDiscountAdded {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub retail_discount: Money,
    pub retail_discount_type: DiscountType,
}

/// Payload of `variant.retail_discount.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailDiscountUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub updated_fields: RetailDiscountFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetailDiscountFields {
    #[serde(default)]
    pub retail_discount: Option<Money>,
    #[serde(default)]
    pub retail_discount_type: Option<DiscountType>,
}

/// Payload of `variant.wholesale_mode.enabled`.
///
/// The discount pair is optional: wholesale can start with or without one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WholesaleModeEnabled {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub wholesale_price: Money,
    pub min_qty_wholesale: i32,
    #[serde(default)]
    pub wholesale_discount: Option<Money>,
    #[serde(default)]
    pub wholesale_discount_type: Option<DiscountType>,
}

/// Payload of `variant.wholesale_mode.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WholesaleModeUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub updated_fields: WholesaleModeFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WholesaleModeFields {
    #[serde(default)]
    pub wholesale_price: Option<Money>,
    #[serde(default)]
    pub min_qty_wholesale: Option<i32>,
}

/// Payload of `variant.wholesale_discount.added`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WholesaleDiscountAdded {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub wholesale_discount: Money,
    pub wholesale_discount_type: DiscountType,
}

/// Payload of `variant.wholesale_discount.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WholesaleDiscountUpdated {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub updated_fields: WholesaleDiscountFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WholesaleDiscountFields {
    #[serde(default)]
    pub wholesale_discount: Option<Money>,
    #[serde(default)]
    pub wholesale_discount_type: Option<DiscountType>,
}

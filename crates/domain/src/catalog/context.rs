//! Denormalized context carried by insertion events.
//!
//! Creation payloads embed everything a read-model row needs so the
//! projector never looks anything up.

use common::{CategoryId, ProductId, SellerId, VariantId};
use serde::{Deserialize, Serialize};

use super::{DiscountType, Money};

fn default_true() -> bool {
    true
}

/// The seller owning the product at the time of the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub seller_id: SellerId,
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_banned: bool,
}

/// The category the product is listed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
}

/// Product-level fields shared by every variant row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub promo_video_url: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub is_approved: bool,
}

/// A sellable variant with its commercial terms and stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDetails {
    pub variant_id: VariantId,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub retail_price: Money,
    #[serde(default)]
    pub retail_discount: Option<Money>,
    #[serde(default)]
    pub retail_discount_type: Option<DiscountType>,
    #[serde(default)]
    pub wholesale_price: Option<Money>,
    #[serde(default)]
    pub min_qty_wholesale: Option<i32>,
    #[serde(default)]
    pub wholesale_discount: Option<Money>,
    #[serde(default)]
    pub wholesale_discount_type: Option<DiscountType>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub weight_grams: i32,
    #[serde(default)]
    pub is_archived: bool,
}

impl VariantDetails {
    /// Creates a variant with only a retail price and default stock fields.
    pub fn new(variant_id: VariantId, retail_price: Money) -> Self {
        Self {
            variant_id,
            color: None,
            size: None,
            retail_price,
            retail_discount: None,
            retail_discount_type: None,
            wholesale_price: None,
            min_qty_wholesale: None,
            wholesale_discount: None,
            wholesale_discount_type: None,
            in_stock: true,
            stock_quantity: 0,
            weight_grams: 0,
            is_archived: false,
        }
    }
}

//! Product-level event payloads.
//!
//! Every payload except `product.created` targets all variant rows of one product.

use common::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};

use super::{CategorySummary, ProductSummary, SellerSummary, VariantDetails};

/// Payload of `product.created`: one product with one or more variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub seller: SellerSummary,
    pub category: CategorySummary,
    pub product: ProductSummary,
    pub variants: Vec<VariantDetails>,
}

/// Payload of `product.info.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfoUpdated {
    pub product_id: ProductId,
    pub updated_fields: ProductInfoFields,
}

/// Fields of `product.info.updated`; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInfoFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Payload of `product.image.added` and `product.image.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImageSet {
    pub product_id: ProductId,
    pub image_url: String,
}

/// Payload of `product.promo_video.added` and `product.promo_video.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPromoVideoSet {
    pub product_id: ProductId,
    pub promo_video_url: String,
}

/// Payload of `product.category_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCategoryUpdated {
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub category_name: String,
}

/// Payload carrying only the product id: image/video removal and archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_id: ProductId,
}

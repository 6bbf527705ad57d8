//! Event type tags written to `outbox_events.event_type`.

pub const PRODUCT_CREATED: &str = "product.created";
pub const PRODUCT_INFO_UPDATED: &str = "product.info.updated";
pub const PRODUCT_IMAGE_ADDED: &str = "product.image.added";
pub const PRODUCT_IMAGE_UPDATED: &str = "product.image.updated";
pub const PRODUCT_IMAGE_REMOVED: &str = "product.image.removed";
pub const PRODUCT_PROMO_VIDEO_ADDED: &str = "product.promo_video.added";
pub const PRODUCT_PROMO_VIDEO_UPDATED: &str = "product.promo_video.updated";
pub const PRODUCT_PROMO_VIDEO_REMOVED: &str = "product.promo_video.removed";
pub const PRODUCT_CATEGORY_UPDATED: &str = "product.category_updated";
pub const PRODUCT_ARCHIVED: &str = "product.archived";

pub const VARIANT_CREATED: &str = "variant.created";
pub const VARIANT_ARCHIVED: &str = "variant.archived";
pub const VARIANT_INFO_UPDATED: &str = "variant.info.updated";
pub const VARIANT_IN_STOCK_UPDATED: &str = "variant.in_stock.updated";
pub const VARIANT_STOCK_QUANTITY_UPDATED: &str = "variant.stock_quantity.updated";
pub const VARIANT_RETAIL_PRICE_UPDATED: &str = "variant.retail_price.updated";
pub const VARIANT_WEIGHT_UPDATED: &str = "variant.weight.updated";
pub const VARIANT_RETAIL_DISCOUNT_ADDED: &str = "variant.retail_discount.added";
pub const VARIANT_RETAIL_DISCOUNT_UPDATED: &str = "variant.retail_discount.updated";
pub const VARIANT_RETAIL_DISCOUNT_REMOVED: &str = "variant.retail_discount.removed";
pub const VARIANT_WHOLESALE_MODE_ENABLED: &str = "variant.wholesale_mode.enabled";
pub const VARIANT_WHOLESALE_MODE_UPDATED: &str = "variant.wholesale_mode.updated";
pub const VARIANT_WHOLESALE_MODE_DISABLED: &str = "variant.wholesale_mode.disabled";
pub const VARIANT_WHOLESALE_DISCOUNT_ADDED: &str = "variant.wholesale_discount.added";
pub const VARIANT_WHOLESALE_DISCOUNT_UPDATED: &str = "variant.wholesale_discount.updated";
pub const VARIANT_WHOLESALE_DISCOUNT_REMOVED: &str = "variant.wholesale_discount.removed";

/// Every event type emitted by the catalog command services.
pub const ALL: &[&str] = &[
    PRODUCT_CREATED,
    PRODUCT_INFO_UPDATED,
    PRODUCT_IMAGE_ADDED,
    PRODUCT_IMAGE_UPDATED,
    PRODUCT_IMAGE_REMOVED,
    PRODUCT_PROMO_VIDEO_ADDED,
    PRODUCT_PROMO_VIDEO_UPDATED,
    PRODUCT_PROMO_VIDEO_REMOVED,
    PRODUCT_CATEGORY_UPDATED,
    PRODUCT_ARCHIVED,
    VARIANT_CREATED,
    VARIANT_ARCHIVED,
    VARIANT_INFO_UPDATED,
    VARIANT_IN_STOCK_UPDATED,
    VARIANT_STOCK_QUANTITY_UPDATED,
    VARIANT_RETAIL_PRICE_UPDATED,
    VARIANT_WEIGHT_UPDATED,
    VARIANT_RETAIL_DISCOUNT_ADDED,
    VARIANT_RETAIL_DISCOUNT_UPDATED,
    VARIANT_RETAIL_DISCOUNT_REMOVED,
    VARIANT_WHOLESALE_MODE_ENABLED,
    VARIANT_WHOLESALE_MODE_UPDATED,
    VARIANT_WHOLESALE_MODE_DISABLED,
    VARIANT_WHOLESALE_DISCOUNT_ADDED,
    VARIANT_WHOLESALE_DISCOUNT_UPDATED,
    VARIANT_WHOLESALE_DISCOUNT_REMOVED,
];

//! Read-model rows and query access.
//!
//! Both projections are keyed by `(product_id, variant_id)` and share the same
//! column set; the search index adds search metadata on top.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    CategoryId, CategorySummary, DiscountType, Money, ProductId, ProductSummary, SellerId,
    SellerSummary, VariantDetails, VariantId,
};

use crate::Result;

/// The two independently maintained projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadModel {
    /// Command-path projection used for ownership, moderation and pricing checks.
    Snapshot,
    /// Public feed/search projection.
    SearchIndex,
}

impl ReadModel {
    /// Returns the name of this read model.
    pub fn name(&self) -> &'static str {
        match self {
            ReadModel::Snapshot => "snapshot",
            ReadModel::SearchIndex => "search_index",
        }
    }

    /// Returns the backing table.
    pub fn table_name(&self) -> &'static str {
        match self {
            ReadModel::Snapshot => "product_variant_snapshots",
            ReadModel::SearchIndex => "product_search_index",
        }
    }
}

impl std::fmt::Display for ReadModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Natural key of a read-model row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

impl RowKey {
    pub fn new(product_id: ProductId, variant_id: VariantId) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.product_id, self.variant_id)
    }
}

/// One denormalized (product, variant) row.
///
/// This is the full snapshot row; the search index stores the same columns
/// inside an [`IndexRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRow {
    pub product_id: ProductId,
    pub variant_id: VariantId,

    pub seller_id: SellerId,
    pub seller_name: String,
    pub seller_is_archived: bool,
    pub seller_is_banned: bool,

    pub category_id: CategoryId,
    pub category_name: String,
    pub category_is_archived: bool,

    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub promo_video_url: Option<String>,
    pub product_is_archived: bool,
    pub product_is_banned: bool,
    pub product_is_approved: bool,

    pub color: Option<String>,
    pub size: Option<String>,
    pub variant_is_archived: bool,

    pub retail_price: Money,
    pub has_retail_discount: bool,
    pub retail_discount: Option<Money>,
    pub retail_discount_type: Option<DiscountType>,

    pub has_wholesale_enabled: bool,
    pub wholesale_price: Option<Money>,
    pub wholesale_min_quantity: Option<i32>,
    pub has_wholesale_discount: bool,
    pub wholesale_discount: Option<Money>,
    pub wholesale_discount_type: Option<DiscountType>,

    pub in_stock: bool,
    pub stock_quantity: i32,
    pub weight_grams: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VariantRow {
    /// Builds a fresh row from the denormalized context of a creation event.
    pub fn from_created(
        seller: &SellerSummary,
        category: &CategorySummary,
        product: &ProductSummary,
        variant: &VariantDetails,
        now: DateTime<Utc>,
    ) -> Self {
        let mut row = Self {
            product_id: product.product_id,
            variant_id: variant.variant_id,
            seller_id: seller.seller_id,
            seller_name: seller.name.clone(),
            seller_is_archived: seller.is_archived,
            seller_is_banned: seller.is_banned,
            category_id: category.category_id,
            category_name: category.name.clone(),
            category_is_archived: category.is_archived,
            title: product.title.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            promo_video_url: product.promo_video_url.clone(),
            product_is_archived: product.is_archived,
            product_is_banned: product.is_banned,
            product_is_approved: product.is_approved,
            color: variant.color.clone(),
            size: variant.size.clone(),
            variant_is_archived: variant.is_archived,
            retail_price: variant.retail_price,
            has_retail_discount: false,
            retail_discount: variant.retail_discount,
            retail_discount_type: variant.retail_discount_type,
            has_wholesale_enabled: false,
            wholesale_price: variant.wholesale_price,
            wholesale_min_quantity: variant.min_qty_wholesale,
            has_wholesale_discount: false,
            wholesale_discount: variant.wholesale_discount,
            wholesale_discount_type: variant.wholesale_discount_type,
            in_stock: variant.in_stock,
            stock_quantity: variant.stock_quantity,
            weight_grams: variant.weight_grams,
            created_at: now,
            updated_at: now,
        };
        row.refresh_retail_discount_flag();
        row.refresh_wholesale_flags();
        row
    }

    pub fn key(&self) -> RowKey {
        RowKey::new(self.product_id, self.variant_id)
    }

    /// `has_retail_discount` holds exactly when value and type are both set.
    pub fn refresh_retail_discount_flag(&mut self) {
        self.has_retail_discount =
            self.retail_discount.is_some() && self.retail_discount_type.is_some();
    }

    /// Same rule for the wholesale mode pair and the wholesale discount pair.
    pub fn refresh_wholesale_flags(&mut self) {
        self.has_wholesale_enabled =
            self.wholesale_price.is_some() && self.wholesale_min_quantity.is_some();
        self.has_wholesale_discount =
            self.wholesale_discount.is_some() && self.wholesale_discount_type.is_some();
    }

    /// Returns true when every "has" flag agrees with its value fields.
    pub fn flags_consistent(&self) -> bool {
        self.has_retail_discount
            == (self.retail_discount.is_some() && self.retail_discount_type.is_some())
            && self.has_wholesale_enabled
                == (self.wholesale_price.is_some() && self.wholesale_min_quantity.is_some())
            && self.has_wholesale_discount
                == (self.wholesale_discount.is_some() && self.wholesale_discount_type.is_some())
    }

    /// Returns true when the variant can be shown or sold.
    pub fn is_listed(&self) -> bool {
        !(self.product_is_archived
            || self.variant_is_archived
            || self.product_is_banned
            || self.seller_is_archived
            || self.seller_is_banned
            || self.category_is_archived)
            && self.product_is_approved
    }
}

/// A search-index row: the variant columns plus search metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub variant: VariantRow,

    /// Normalized lexemes of title and description, space separated.
    pub search_document: String,

    /// View counter maintained by the public read path; never written here.
    pub views: i64,
}

/// Query access to the projections.
///
/// The command path reads snapshots; tests read both.
#[async_trait]
pub trait ReadModelReader: Send + Sync {
    /// Loads one snapshot row.
    async fn snapshot(&self, key: RowKey) -> Result<Option<VariantRow>>;

    /// Loads every snapshot row of a product, ordered by variant id.
    async fn snapshot_rows(&self, product_id: ProductId) -> Result<Vec<VariantRow>>;

    /// Loads one search-index row.
    async fn index_entry(&self, key: RowKey) -> Result<Option<IndexRow>>;

    /// Returns the number of rows in a projection.
    async fn count(&self, model: ReadModel) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created_row(variant: VariantDetails) -> VariantRow {
        VariantRow::from_created(
            &SellerSummary {
                seller_id: SellerId::new(),
                name: "Acme".to_string(),
                is_archived: false,
                is_banned: false,
            },
            &CategorySummary {
                category_id: CategoryId::new(),
                name: "Shoes".to_string(),
                is_archived: false,
            },
            &ProductSummary {
                product_id: ProductId::new(),
                title: "Runner".to_string(),
                description: String::new(),
                image_url: None,
                promo_video_url: None,
                is_archived: false,
                is_banned: false,
                is_approved: true,
            },
            &variant,
            Utc::now(),
        )
    }

    #[test]
    fn created_row_without_wholesale_has_flags_off() {
        let row = created_row(VariantDetails::new(VariantId::new(), Money::from_cents(10000)));

        assert!(!row.has_wholesale_enabled);
        assert!(row.wholesale_price.is_none());
        assert!(!row.has_retail_discount);
        assert!(row.flags_consistent());
        assert!(row.is_listed());
    }

    #[test]
    fn created_row_derives_flags_from_values() {
        let mut variant = VariantDetails::new(VariantId::new(), Money::from_cents(10000));
        variant.retail_discount = Some(Money::from_cents(500));
        variant.retail_discount_type = Some(DiscountType::Flat);
        variant.wholesale_price = Some(Money::from_cents(8000));
        variant.min_qty_wholesale = Some(10);

        let row = created_row(variant);

        assert!(row.has_retail_discount);
        assert!(row.has_wholesale_enabled);
        assert!(!row.has_wholesale_discount);
        assert!(row.flags_consistent());
    }

    #[test]
    fn half_set_discount_keeps_flag_off() {
        let mut variant = VariantDetails::new(VariantId::new(), Money::from_cents(10000));
        variant.retail_discount = Some(Money::from_cents(500));

        let row = created_row(variant);
        assert!(!row.has_retail_discount);
        assert!(row.flags_consistent());
    }

    #[test]
    fn archived_variant_is_not_listed() {
        let mut row = created_row(VariantDetails::new(VariantId::new(), Money::from_cents(1)));
        row.variant_is_archived = true;
        assert!(!row.is_listed());
    }

    #[test]
    fn read_model_tables() {
        assert_eq!(ReadModel::Snapshot.table_name(), "product_variant_snapshots");
        assert_eq!(ReadModel::SearchIndex.table_name(), "product_search_index");
        assert_eq!(ReadModel::SearchIndex.to_string(), "search_index");
    }
}

//! Partial row updates.
//!
//! A [`RowUpdate`] describes which columns an event changes and on which rows.
//! Every column is optional: `None` leaves the stored value alone. Nullable
//! columns use `Option<Option<T>>`, where `Some(None)` clears the value.
//! Stores apply an update by recomputing the derived "has" flags from the
//! post-update values whenever one of their inputs is touched.

use chrono::{DateTime, Utc};
use domain::catalog::{
    InStockUpdated, ProductCategoryUpdated, ProductImageSet, ProductInfoUpdated,
    ProductPromoVideoSet, ProductRef, RetailDiscountAdded, RetailDiscountUpdated,
    RetailPriceUpdated, StockQuantityUpdated, VariantInfoUpdated, VariantRef, WeightUpdated,
    WholesaleDiscountAdded, WholesaleDiscountUpdated, WholesaleModeEnabled, WholesaleModeUpdated,
};
use domain::{CatalogEvent, CategoryId, DiscountType, Money, ProductId};

use crate::read_model::{RowKey, VariantRow};

/// The rows an update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    /// Every variant row of a product.
    Product(ProductId),
    /// A single (product, variant) row.
    Variant(RowKey),
}

impl RowTarget {
    pub fn matches(&self, key: &RowKey) -> bool {
        match self {
            RowTarget::Product(product_id) => key.product_id == *product_id,
            RowTarget::Variant(target) => target == key,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            RowTarget::Product(product_id) => *product_id,
            RowTarget::Variant(key) => key.product_id,
        }
    }
}

impl std::fmt::Display for RowTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowTarget::Product(product_id) => write!(f, "product {product_id}"),
            RowTarget::Variant(key) => write!(f, "variant {key}"),
        }
    }
}

impl From<&VariantRef> for RowTarget {
    fn from(r: &VariantRef) -> Self {
        RowTarget::Variant(RowKey::new(r.product_id, r.variant_id))
    }
}

/// A column-level patch applied to every row matched by `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    pub target: RowTarget,

    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
    pub promo_video_url: Option<Option<String>>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub product_is_archived: Option<bool>,

    pub color: Option<String>,
    pub size: Option<String>,
    pub variant_is_archived: Option<bool>,
    pub in_stock: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub weight_grams: Option<i32>,

    pub retail_price: Option<Money>,
    pub retail_discount: Option<Option<Money>>,
    pub retail_discount_type: Option<Option<DiscountType>>,

    pub wholesale_price: Option<Option<Money>>,
    pub wholesale_min_quantity: Option<Option<i32>>,
    pub wholesale_discount: Option<Option<Money>>,
    pub wholesale_discount_type: Option<Option<DiscountType>>,

    /// Re-derive the search document from the post-update title and
    /// description. Only meaningful for the search index.
    pub refresh_search: bool,
}

impl RowUpdate {
    /// An update of `target` that changes nothing but `updated_at`.
    pub fn new(target: RowTarget) -> Self {
        Self {
            target,
            title: None,
            description: None,
            image_url: None,
            promo_video_url: None,
            category_id: None,
            category_name: None,
            product_is_archived: None,
            color: None,
            size: None,
            variant_is_archived: None,
            in_stock: None,
            stock_quantity: None,
            weight_grams: None,
            retail_price: None,
            retail_discount: None,
            retail_discount_type: None,
            wholesale_price: None,
            wholesale_min_quantity: None,
            wholesale_discount: None,
            wholesale_discount_type: None,
            refresh_search: false,
        }
    }

    pub fn for_product(product_id: ProductId) -> Self {
        Self::new(RowTarget::Product(product_id))
    }

    pub fn for_variant(variant: &VariantRef) -> Self {
        Self::new(variant.into())
    }

    /// Marks the update as refreshing the search document when it touches
    /// title or description.
    pub fn with_search_refresh(mut self) -> Self {
        self.refresh_search = self.touches_search_text();
        self
    }

    pub fn touches_search_text(&self) -> bool {
        self.title.is_some() || self.description.is_some()
    }

    pub fn touches_retail_discount(&self) -> bool {
        self.retail_discount.is_some() || self.retail_discount_type.is_some()
    }

    pub fn touches_wholesale_mode(&self) -> bool {
        self.wholesale_price.is_some() || self.wholesale_min_quantity.is_some()
    }

    pub fn touches_wholesale_discount(&self) -> bool {
        self.wholesale_discount.is_some() || self.wholesale_discount_type.is_some()
    }

    /// Applies the patch to an in-memory row.
    pub fn apply_to(&self, row: &mut VariantRow, now: DateTime<Utc>) {
        set(&mut row.title, &self.title);
        set(&mut row.description, &self.description);
        set(&mut row.image_url, &self.image_url);
        set(&mut row.promo_video_url, &self.promo_video_url);
        set(&mut row.category_id, &self.category_id);
        set(&mut row.category_name, &self.category_name);
        set(&mut row.product_is_archived, &self.product_is_archived);
        set(&mut row.variant_is_archived, &self.variant_is_archived);
        set(&mut row.in_stock, &self.in_stock);
        set(&mut row.stock_quantity, &self.stock_quantity);
        set(&mut row.weight_grams, &self.weight_grams);
        set(&mut row.retail_price, &self.retail_price);
        set(&mut row.retail_discount, &self.retail_discount);
        set(&mut row.retail_discount_type, &self.retail_discount_type);
        set(&mut row.wholesale_price, &self.wholesale_price);
        set(&mut row.wholesale_min_quantity, &self.wholesale_min_quantity);
        set(&mut row.wholesale_discount, &self.wholesale_discount);
        set(&mut row.wholesale_discount_type, &self.wholesale_discount_type);
        if let Some(color) = &self.color {
            row.color = Some(color.clone());
        }
        if let Some(size) = &self.size {
            row.size = Some(size.clone());
        }

        if self.touches_retail_discount() {
            row.refresh_retail_discount_flag();
        }
        if self.touches_wholesale_mode() || self.touches_wholesale_discount() {
            row.refresh_wholesale_flags();
        }
        row.updated_at = now;
    }
}

fn set<T: Clone>(column: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *column = value.clone();
    }
}

impl From<&ProductInfoUpdated> for RowUpdate {
    fn from(e: &ProductInfoUpdated) -> Self {
        Self {
            title: e.updated_fields.title.clone(),
            description: e.updated_fields.description.clone(),
            ..Self::for_product(e.product_id)
        }
    }
}

/// Covers both image added and image updated.
impl From<&ProductImageSet> for RowUpdate {
    fn from(e: &ProductImageSet) -> Self {
        Self {
            image_url: Some(Some(e.image_url.clone())),
            ..Self::for_product(e.product_id)
        }
    }
}

impl From<&ProductPromoVideoSet> for RowUpdate {
    fn from(e: &ProductPromoVideoSet) -> Self {
        Self {
            promo_video_url: Some(Some(e.promo_video_url.clone())),
            ..Self::for_product(e.product_id)
        }
    }
}

impl From<&ProductCategoryUpdated> for RowUpdate {
    fn from(e: &ProductCategoryUpdated) -> Self {
        Self {
            category_id: Some(e.category_id),
            category_name: Some(e.category_name.clone()),
            ..Self::for_product(e.product_id)
        }
    }
}

impl From<&VariantInfoUpdated> for RowUpdate {
    fn from(e: &VariantInfoUpdated) -> Self {
        Self {
            color: e.updated_fields.color.clone(),
            size: e.updated_fields.size.clone(),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&InStockUpdated> for RowUpdate {
    fn from(e: &InStockUpdated) -> Self {
        Self {
            in_stock: Some(e.in_stock),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&StockQuantityUpdated> for RowUpdate {
    fn from(e: &StockQuantityUpdated) -> Self {
        Self {
            stock_quantity: Some(e.stock_quantity),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&RetailPriceUpdated> for RowUpdate {
    fn from(e: &RetailPriceUpdated) -> Self {
        Self {
            retail_price: Some(e.retail_price),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&WeightUpdated> for RowUpdate {
    fn from(e: &WeightUpdated) -> Self {
        Self {
            weight_grams: Some(e.weight_grams),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&RetailDiscountAdded> for RowUpdate {
    fn from(e: &RetailDiscountAdded) -> Self {
        Self {
            retail_discount: Some(Some(e.retail_discount)),
            retail_discount_type: Some(Some(e.retail_discount_type)),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&RetailDiscountUpdated> for RowUpdate {
    fn from(e: &RetailDiscountUpdated) -> Self {
        let fields = &e.updated_fields;
        Self {
            retail_discount: fields.retail_discount.map(Some),
            retail_discount_type: fields.retail_discount_type.map(Some),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&WholesaleModeEnabled> for RowUpdate {
    fn from(e: &WholesaleModeEnabled) -> Self {
        Self {
            wholesale_price: Some(Some(e.wholesale_price)),
            wholesale_min_quantity: Some(Some(e.min_qty_wholesale)),
            wholesale_discount: Some(e.wholesale_discount),
            wholesale_discount_type: Some(e.wholesale_discount_type),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&WholesaleModeUpdated> for RowUpdate {
    fn from(e: &WholesaleModeUpdated) -> Self {
        let fields = &e.updated_fields;
        Self {
            wholesale_price: fields.wholesale_price.map(Some),
            wholesale_min_quantity: fields.min_qty_wholesale.map(Some),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&WholesaleDiscountAdded> for RowUpdate {
    fn from(e: &WholesaleDiscountAdded) -> Self {
        Self {
            wholesale_discount: Some(Some(e.wholesale_discount)),
            wholesale_discount_type: Some(Some(e.wholesale_discount_type)),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

impl From<&WholesaleDiscountUpdated> for RowUpdate {
    fn from(e: &WholesaleDiscountUpdated) -> Self {
        let fields = &e.updated_fields;
        Self {
            wholesale_discount: fields.wholesale_discount.map(Some),
            wholesale_discount_type: fields.wholesale_discount_type.map(Some),
            ..Self::new(RowTarget::Variant(RowKey::new(e.product_id, e.variant_id)))
        }
    }
}

/// Patches for the id-only events.
impl RowUpdate {
    pub fn image_removed(e: &ProductRef) -> Self {
        Self {
            image_url: Some(None),
            ..Self::for_product(e.product_id)
        }
    }

    pub fn promo_video_removed(e: &ProductRef) -> Self {
        Self {
            promo_video_url: Some(None),
            ..Self::for_product(e.product_id)
        }
    }

    pub fn product_archived(e: &ProductRef) -> Self {
        Self {
            product_is_archived: Some(true),
            ..Self::for_product(e.product_id)
        }
    }

    pub fn variant_archived(e: &VariantRef) -> Self {
        Self {
            variant_is_archived: Some(true),
            ..Self::for_variant(e)
        }
    }

    pub fn retail_discount_removed(e: &VariantRef) -> Self {
        Self {
            retail_discount: Some(None),
            retail_discount_type: Some(None),
            ..Self::for_variant(e)
        }
    }

    /// Disabling wholesale also drops the wholesale discount.
    pub fn wholesale_mode_disabled(e: &VariantRef) -> Self {
        Self {
            wholesale_price: Some(None),
            wholesale_min_quantity: Some(None),
            wholesale_discount: Some(None),
            wholesale_discount_type: Some(None),
            ..Self::for_variant(e)
        }
    }

    pub fn wholesale_discount_removed(e: &VariantRef) -> Self {
        Self {
            wholesale_discount: Some(None),
            wholesale_discount_type: Some(None),
            ..Self::for_variant(e)
        }
    }
}

/// The effect of one catalog event on a read model.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    /// Create rows unless their key already exists.
    Insert(Vec<VariantRow>),
    /// Patch existing rows.
    Update(RowUpdate),
}

impl RowChange {
    /// Maps an event to the rows it creates or the patch it applies.
    ///
    /// This is the per-event-type applier table for both projections: the
    /// snapshot and search-index projectors each write the change it returns.
    pub fn for_event(event: &CatalogEvent, now: DateTime<Utc>) -> Self {
        match event {
            CatalogEvent::ProductCreated(e) => RowChange::Insert(
                e.variants
                    .iter()
                    .map(|variant| {
                        VariantRow::from_created(&e.seller, &e.category, &e.product, variant, now)
                    })
                    .collect(),
            ),
            CatalogEvent::VariantCreated(e) => RowChange::Insert(vec![VariantRow::from_created(
                &e.seller,
                &e.category,
                &e.product,
                &e.variant,
                now,
            )]),
            CatalogEvent::ProductInfoUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::ProductImageAdded(e) | CatalogEvent::ProductImageUpdated(e) => {
                RowChange::Update(e.into())
            }
            CatalogEvent::ProductImageRemoved(e) => RowChange::Update(RowUpdate::image_removed(e)),
            CatalogEvent::ProductPromoVideoAdded(e) | CatalogEvent::ProductPromoVideoUpdated(e) => {
                RowChange::Update(e.into())
            }
            CatalogEvent::ProductPromoVideoRemoved(e) => {
                RowChange::Update(RowUpdate::promo_video_removed(e))
            }
            CatalogEvent::ProductCategoryUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::ProductArchived(e) => RowChange::Update(RowUpdate::product_archived(e)),
            CatalogEvent::VariantArchived(e) => RowChange::Update(RowUpdate::variant_archived(e)),
            CatalogEvent::VariantInfoUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::InStockUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::StockQuantityUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::RetailPriceUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::WeightUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::RetailDiscountAdded(e) => RowChange::Update(e.into()),
            CatalogEvent::RetailDiscountUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::RetailDiscountRemoved(e) => {
                RowChange::Update(RowUpdate::retail_discount_removed(e))
            }
            CatalogEvent::WholesaleModeEnabled(e) => RowChange::Update(e.into()),
            CatalogEvent::WholesaleModeUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::WholesaleModeDisabled(e) => {
                RowChange::Update(RowUpdate::wholesale_mode_disabled(e))
            }
            CatalogEvent::WholesaleDiscountAdded(e) => RowChange::Update(e.into()),
            CatalogEvent::WholesaleDiscountUpdated(e) => RowChange::Update(e.into()),
            CatalogEvent::WholesaleDiscountRemoved(e) => {
                RowChange::Update(RowUpdate::wholesale_discount_removed(e))
            }
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{CategoryId, DiscountType, Money, ProductId, SellerId, VariantId};
use outbox::EventId;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use crate::change::{RowTarget, RowUpdate};
use crate::read_model::{IndexRow, ReadModel, ReadModelReader, RowKey, VariantRow};
use crate::store::{ReadModelSession, ReadModelStore};
use crate::{ProjectionError, Result};

const VARIANT_COLUMNS: &str = "product_id, variant_id, \
    seller_id, seller_name, seller_is_archived, seller_is_banned, \
    category_id, category_name, category_is_archived, \
    title, description, image_url, promo_video_url, \
    product_is_archived, product_is_banned, product_is_approved, \
    color, size, variant_is_archived, \
    retail_price, has_retail_discount, retail_discount, retail_discount_type, \
    has_wholesale_enabled, wholesale_price, wholesale_min_quantity, \
    has_wholesale_discount, wholesale_discount, wholesale_discount_type, \
    in_stock, stock_quantity, weight_grams, created_at, updated_at";

const VARIANT_VALUES: &str = "$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34";

/// Search document of the index, seeded from the `title` ($10) and
/// `description` ($11) parameters.
const SEARCH_VECTOR_FROM_PARAMS: &str = "to_tsvector('simple', $10 || ' ' || $11)";

/// PostgreSQL-backed read models.
#[derive(Clone)]
pub struct PgReadModelStore {
    pool: PgPool,
}

impl PgReadModelStore {
    /// Creates a new PostgreSQL read-model store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ReadModelStore for PgReadModelStore {
    async fn begin(&self) -> Result<Box<dyn ReadModelSession>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }
}

#[async_trait]
impl ReadModelReader for PgReadModelStore {
    async fn snapshot(&self, key: RowKey) -> Result<Option<VariantRow>> {
        let row = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variant_snapshots \
             WHERE product_id = $1 AND variant_id = $2"
        ))
        .bind(key.product_id.as_uuid())
        .bind(key.variant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_variant).transpose()
    }

    async fn snapshot_rows(&self, product_id: ProductId) -> Result<Vec<VariantRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variant_snapshots \
             WHERE product_id = $1 ORDER BY variant_id"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_variant).collect()
    }

    async fn index_entry(&self, key: RowKey) -> Result<Option<IndexRow>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {VARIANT_COLUMNS},
                   array_to_string(tsvector_to_array(search_vector), ' ') AS search_document,
                   views
            FROM product_search_index
            WHERE product_id = $1 AND variant_id = $2
            "#
        ))
        .bind(key.product_id.as_uuid())
        .bind(key.variant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(IndexRow {
            variant: row_to_variant(&row)?,
            search_document: row.try_get("search_document")?,
            views: row.try_get("views")?,
        }))
    }

    async fn count(&self, model: ReadModel) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", model.table_name()))
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// A read-model session backed by one database transaction.
///
/// Dropping the session without committing rolls the transaction back.
struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReadModelSession for PgSession {
    async fn insert_rows(&mut self, model: ReadModel, rows: &[VariantRow]) -> Result<u64> {
        let sql = match model {
            ReadModel::Snapshot => format!(
                "INSERT INTO product_variant_snapshots ({VARIANT_COLUMNS}) \
                 VALUES ({VARIANT_VALUES}) \
                 ON CONFLICT (product_id, variant_id) DO NOTHING"
            ),
            ReadModel::SearchIndex => format!(
                "INSERT INTO product_search_index ({VARIANT_COLUMNS}, search_vector, views) \
                 VALUES ({VARIANT_VALUES}, {SEARCH_VECTOR_FROM_PARAMS}, 0) \
                 ON CONFLICT (product_id, variant_id) DO NOTHING"
            ),
        };

        let mut inserted = 0;
        for row in rows {
            let result = bind_variant(sqlx::query(&sql), row)
                .execute(&mut *self.tx)
                .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn update_rows(&mut self, model: ReadModel, update: &RowUpdate) -> Result<u64> {
        let mut query = build_update(model, update, Utc::now());
        let result = query.build().execute(&mut *self.tx).await?;

        tracing::debug!(
            model = %model,
            target = %update.target,
            rows = result.rows_affected(),
            "read model updated"
        );

        Ok(result.rows_affected())
    }

    async fn mark_dispatched(&mut self, event_id: EventId, at: DateTime<Utc>) -> Result<bool> {
        Ok(outbox::postgres::mark_dispatched_with(&mut *self.tx, event_id, at).await?)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn bind_variant<'q>(
    query: Query<'q, Postgres, PgArguments>,
    row: &'q VariantRow,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(row.product_id.as_uuid())
        .bind(row.variant_id.as_uuid())
        .bind(row.seller_id.as_uuid())
        .bind(&row.seller_name)
        .bind(row.seller_is_archived)
        .bind(row.seller_is_banned)
        .bind(row.category_id.as_uuid())
        .bind(&row.category_name)
        .bind(row.category_is_archived)
        .bind(&row.title)
        .bind(&row.description)
        .bind(&row.image_url)
        .bind(&row.promo_video_url)
        .bind(row.product_is_archived)
        .bind(row.product_is_banned)
        .bind(row.product_is_approved)
        .bind(&row.color)
        .bind(&row.size)
        .bind(row.variant_is_archived)
        .bind(row.retail_price.cents())
        .bind(row.has_retail_discount)
        .bind(row.retail_discount.map(|m| m.cents()))
        .bind(row.retail_discount_type.map(|t| t.as_str()))
        .bind(row.has_wholesale_enabled)
        .bind(row.wholesale_price.map(|m| m.cents()))
        .bind(row.wholesale_min_quantity)
        .bind(row.has_wholesale_discount)
        .bind(row.wholesale_discount.map(|m| m.cents()))
        .bind(row.wholesale_discount_type.map(|t| t.as_str()))
        .bind(row.in_stock)
        .bind(row.stock_quantity)
        .bind(row.weight_grams)
        .bind(row.created_at)
        .bind(row.updated_at)
}

/// Builds the `UPDATE` for a row patch.
///
/// Only supplied columns are assigned. Each "has" flag whose inputs are
/// touched is recomputed in the same statement: a touched input contributes
/// its new presence, an untouched one its current column value.
fn build_update(
    model: ReadModel,
    update: &RowUpdate,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET updated_at = ", model.table_name()));
    qb.push_bind(now);

    set_column(&mut qb, "title", update.title.clone());
    set_column(&mut qb, "description", update.description.clone());
    set_column(&mut qb, "image_url", update.image_url.clone());
    set_column(&mut qb, "promo_video_url", update.promo_video_url.clone());
    set_column(&mut qb, "category_id", update.category_id.map(|id| id.as_uuid()));
    set_column(&mut qb, "category_name", update.category_name.clone());
    set_column(&mut qb, "product_is_archived", update.product_is_archived);
    set_column(&mut qb, "color", update.color.clone());
    set_column(&mut qb, "size", update.size.clone());
    set_column(&mut qb, "variant_is_archived", update.variant_is_archived);
    set_column(&mut qb, "in_stock", update.in_stock);
    set_column(&mut qb, "stock_quantity", update.stock_quantity);
    set_column(&mut qb, "weight_grams", update.weight_grams);
    set_column(&mut qb, "retail_price", update.retail_price.map(|m| m.cents()));
    set_column(
        &mut qb,
        "retail_discount",
        update.retail_discount.map(|v| v.map(|m| m.cents())),
    );
    set_column(
        &mut qb,
        "retail_discount_type",
        update.retail_discount_type.map(|v| v.map(|t| t.as_str())),
    );
    set_column(
        &mut qb,
        "wholesale_price",
        update.wholesale_price.map(|v| v.map(|m| m.cents())),
    );
    set_column(&mut qb, "wholesale_min_quantity", update.wholesale_min_quantity);
    set_column(
        &mut qb,
        "wholesale_discount",
        update.wholesale_discount.map(|v| v.map(|m| m.cents())),
    );
    set_column(
        &mut qb,
        "wholesale_discount_type",
        update.wholesale_discount_type.map(|v| v.map(|t| t.as_str())),
    );

    if update.touches_retail_discount() {
        qb.push(format!(
            ", has_retail_discount = ({} AND {})",
            presence(update.retail_discount.map(|v| v.is_some()), "retail_discount"),
            presence(update.retail_discount_type.map(|v| v.is_some()), "retail_discount_type"),
        ));
    }
    if update.touches_wholesale_mode() {
        qb.push(format!(
            ", has_wholesale_enabled = ({} AND {})",
            presence(update.wholesale_price.map(|v| v.is_some()), "wholesale_price"),
            presence(
                update.wholesale_min_quantity.map(|v| v.is_some()),
                "wholesale_min_quantity"
            ),
        ));
    }
    if update.touches_wholesale_discount() {
        qb.push(format!(
            ", has_wholesale_discount = ({} AND {})",
            presence(update.wholesale_discount.map(|v| v.is_some()), "wholesale_discount"),
            presence(
                update.wholesale_discount_type.map(|v| v.is_some()),
                "wholesale_discount_type"
            ),
        ));
    }

    if update.refresh_search && model == ReadModel::SearchIndex {
        qb.push(", search_vector = to_tsvector('simple', ");
        match &update.title {
            Some(title) => qb.push_bind(title.clone()),
            None => qb.push("title"),
        };
        qb.push(" || ' ' || ");
        match &update.description {
            Some(description) => qb.push_bind(description.clone()),
            None => qb.push("description"),
        };
        qb.push(")");
    }

    match update.target {
        RowTarget::Product(product_id) => {
            qb.push(" WHERE product_id = ").push_bind(product_id.as_uuid());
        }
        RowTarget::Variant(key) => {
            qb.push(" WHERE product_id = ")
                .push_bind(key.product_id.as_uuid())
                .push(" AND variant_id = ")
                .push_bind(key.variant_id.as_uuid());
        }
    }

    qb
}

fn set_column<T>(qb: &mut QueryBuilder<'static, Postgres>, column: &str, value: Option<T>)
where
    T: 'static + sqlx::Encode<'static, Postgres> + sqlx::Type<Postgres> + Send,
{
    if let Some(value) = value {
        qb.push(", ").push(column).push(" = ").push_bind(value);
    }
}

/// SQL for "this column is non-null after the update".
fn presence(touched: Option<bool>, column: &str) -> String {
    match touched {
        Some(true) => "TRUE".to_string(),
        Some(false) => "FALSE".to_string(),
        None => format!("{column} IS NOT NULL"),
    }
}

fn row_to_variant(row: &PgRow) -> Result<VariantRow> {
    Ok(VariantRow {
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        variant_id: VariantId::from_uuid(row.try_get::<Uuid, _>("variant_id")?),
        seller_id: SellerId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
        seller_name: row.try_get("seller_name")?,
        seller_is_archived: row.try_get("seller_is_archived")?,
        seller_is_banned: row.try_get("seller_is_banned")?,
        category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
        category_name: row.try_get("category_name")?,
        category_is_archived: row.try_get("category_is_archived")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        promo_video_url: row.try_get("promo_video_url")?,
        product_is_archived: row.try_get("product_is_archived")?,
        product_is_banned: row.try_get("product_is_banned")?,
        product_is_approved: row.try_get("product_is_approved")?,
        color: row.try_get("color")?,
        size: row.try_get("size")?,
        variant_is_archived: row.try_get("variant_is_archived")?,
        retail_price: Money::from_cents(row.try_get("retail_price")?),
        has_retail_discount: row.try_get("has_retail_discount")?,
        retail_discount: money(row, "retail_discount")?,
        retail_discount_type: discount_type(row, "retail_discount_type")?,
        has_wholesale_enabled: row.try_get("has_wholesale_enabled")?,
        wholesale_price: money(row, "wholesale_price")?,
        wholesale_min_quantity: row.try_get("wholesale_min_quantity")?,
        has_wholesale_discount: row.try_get("has_wholesale_discount")?,
        wholesale_discount: money(row, "wholesale_discount")?,
        wholesale_discount_type: discount_type(row, "wholesale_discount_type")?,
        in_stock: row.try_get("in_stock")?,
        stock_quantity: row.try_get("stock_quantity")?,
        weight_grams: row.try_get("weight_grams")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn money(row: &PgRow, column: &str) -> Result<Option<Money>> {
    Ok(row
        .try_get::<Option<i64>, _>(column)?
        .map(Money::from_cents))
}

fn discount_type(row: &PgRow, column: &str) -> Result<Option<DiscountType>> {
    match row.try_get::<Option<String>, _>(column)? {
        None => Ok(None),
        Some(value) => DiscountType::parse(&value).map(Some).ok_or_else(|| {
            ProjectionError::Projection(format!("unknown discount type {value:?} in {column}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::catalog::VariantRef;

    #[test]
    fn update_assigns_only_supplied_columns() {
        let update = RowUpdate {
            title: Some("Runner".to_string()),
            ..RowUpdate::for_product(ProductId::new())
        };
        let sql = build_update(ReadModel::Snapshot, &update, Utc::now()).into_sql();

        assert!(sql.starts_with("UPDATE product_variant_snapshots SET updated_at = $1"));
        assert!(sql.contains(", title = $2"));
        assert!(!sql.contains("description ="));
        assert!(!sql.contains("search_vector"));
        assert!(sql.ends_with(" WHERE product_id = $3"));
    }

    #[test]
    fn removing_discount_recomputes_flag_from_new_values() {
        let target = VariantRef {
            product_id: ProductId::new(),
            variant_id: VariantId::new(),
        };
        let sql = build_update(
            ReadModel::SearchIndex,
            &RowUpdate::retail_discount_removed(&target),
            Utc::now(),
        )
        .into_sql();

        assert!(sql.contains("has_retail_discount = (FALSE AND FALSE)"));
        assert!(!sql.contains("has_wholesale"));
        assert!(sql.contains("AND variant_id = "));
    }

    #[test]
    fn partial_discount_update_uses_current_column_for_untouched_half() {
        let update = RowUpdate {
            retail_discount: Some(Some(Money::from_cents(500))),
            ..RowUpdate::new(RowTarget::Variant(RowKey::new(ProductId::new(), VariantId::new())))
        };
        let sql = build_update(ReadModel::Snapshot, &update, Utc::now()).into_sql();

        assert!(sql.contains("has_retail_discount = (TRUE AND retail_discount_type IS NOT NULL)"));
    }

    #[test]
    fn search_refresh_binds_new_title_and_keeps_description() {
        let update = RowUpdate {
            title: Some("Sprinter".to_string()),
            ..RowUpdate::for_product(ProductId::new())
        }
        .with_search_refresh();

        let index_sql = build_update(ReadModel::SearchIndex, &update, Utc::now()).into_sql();
        assert!(index_sql.contains("search_vector = to_tsvector('simple', $3 || ' ' || description)"));

        let snapshot_sql = build_update(ReadModel::Snapshot, &update, Utc::now()).into_sql();
        assert!(!snapshot_sql.contains("search_vector"));
    }
}

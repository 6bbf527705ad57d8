//! Integration tests: raw outbox rows → Dispatcher → both read models.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use domain::{CategoryId, ProductId, SellerId, VariantId, event_types};
use outbox::{InMemoryOutboxStore, OutboxEvent, OutboxStore};
use projections::{
    Dispatcher, DispatcherConfig, InMemoryReadModelStore, IndexRow, ReadModel, ReadModelReader,
    RowKey, VariantRow,
};
use serde_json::{Value, json};

/// Helper to set up the outbox, the read models and a dispatcher over both.
fn setup() -> (
    InMemoryOutboxStore,
    InMemoryReadModelStore,
    Dispatcher<InMemoryOutboxStore, InMemoryReadModelStore>,
) {
    let outbox = InMemoryOutboxStore::new();
    let store = InMemoryReadModelStore::with_outbox(outbox.clone());
    let dispatcher = Dispatcher::new(outbox.clone(), store.clone(), DispatcherConfig::default());
    (outbox, store, dispatcher)
}

/// Appends events with strictly increasing `created_at`, in slice order.
async fn append_all(outbox: &InMemoryOutboxStore, events: &[(&str, Value)]) {
    let base = Utc::now() - Duration::seconds(events.len() as i64 + 1);
    for (i, (event_type, payload)) in events.iter().enumerate() {
        outbox
            .append(
                OutboxEvent::builder()
                    .event_type(*event_type)
                    .payload_raw(payload.clone())
                    .created_at(base + Duration::seconds(i as i64))
                    .build(),
            )
            .await
            .unwrap();
    }
}

fn variant_created(key: RowKey) -> Value {
    json!({
        "seller": {"seller_id": SellerId::new(), "name": "Acme Outdoor"},
        "category": {"category_id": CategoryId::new(), "name": "Footwear"},
        "product": {
            "product_id": key.product_id,
            "title": "Trail Runner",
            "description": "Grippy sole for wet rock",
            "is_approved": true
        },
        "variant": {
            "variant_id": key.variant_id,
            "color": "red",
            "size": "42",
            "retail_price": 12000,
            "wholesale_price": null,
            "stock_quantity": 7,
            "weight_grams": 350
        }
    })
}

fn variant_ids(key: RowKey) -> Value {
    json!({"product_id": key.product_id, "variant_id": key.variant_id})
}

fn with_ids(key: RowKey, fields: Value) -> Value {
    let mut payload = variant_ids(key);
    if let (Some(target), Value::Object(fields)) = (payload.as_object_mut(), fields) {
        target.extend(fields);
    }
    payload
}

fn new_key() -> RowKey {
    RowKey::new(ProductId::new(), VariantId::new())
}

#[tokio::test]
async fn test_variant_created_without_wholesale() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();

    append_all(&outbox, &[(event_types::VARIANT_CREATED, variant_created(key))]).await;
    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.dispatched, 1);

    let snapshot = store.snapshot(key).await.unwrap().unwrap();
    assert!(!snapshot.has_wholesale_enabled);
    assert!(snapshot.wholesale_price.is_none());
    assert_eq!(snapshot.stock_quantity, 7);

    let entry = store.index_entry(key).await.unwrap().unwrap();
    assert!(!entry.variant.has_wholesale_enabled);
    assert!(entry.variant.wholesale_price.is_none());
    assert_eq!(entry.views, 0);
}

#[tokio::test]
async fn test_wholesale_enabled_leaves_discount_unset() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();

    append_all(
        &outbox,
        &[
            (event_types::VARIANT_CREATED, variant_created(key)),
            (
                event_types::VARIANT_WHOLESALE_MODE_ENABLED,
                with_ids(key, json!({"wholesale_price": 5000, "min_qty_wholesale": 10})),
            ),
        ],
    )
    .await;
    dispatcher.tick().await.unwrap();

    for row in [
        store.snapshot(key).await.unwrap().unwrap(),
        store.index_entry(key).await.unwrap().unwrap().variant,
    ] {
        assert!(row.has_wholesale_enabled);
        assert_eq!(row.wholesale_price.map(|m| m.cents()), Some(5000));
        assert_eq!(row.wholesale_min_quantity, Some(10));
        assert!(!row.has_wholesale_discount);
        assert!(row.wholesale_discount.is_none());
        assert!(row.wholesale_discount_type.is_none());
    }
}

#[tokio::test]
async fn test_partial_retail_discount_update_preserves_type() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();

    append_all(
        &outbox,
        &[
            (event_types::VARIANT_CREATED, variant_created(key)),
            (
                event_types::VARIANT_RETAIL_DISCOUNT_ADDED,
                with_ids(
                    key,
                    json!({"retail_discount": 1000, "retail_discount_type": "percentage"}),
                ),
            ),
            (
                event_types::VARIANT_RETAIL_DISCOUNT_UPDATED,
                with_ids(key, json!({"updated_fields": {"retail_discount": 500}})),
            ),
        ],
    )
    .await;
    assert_eq!(dispatcher.tick().await.unwrap().dispatched, 3);

    let snapshot = store.snapshot(key).await.unwrap().unwrap();
    assert_eq!(snapshot.retail_discount.map(|m| m.cents()), Some(500));
    assert_eq!(
        snapshot.retail_discount_type.map(|t| t.as_str()),
        Some("percentage")
    );
    assert!(snapshot.has_retail_discount);
    assert!(snapshot.flags_consistent());
}

#[tokio::test]
async fn test_wholesale_disabled_clears_active_discount() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();

    append_all(
        &outbox,
        &[
            (event_types::VARIANT_CREATED, variant_created(key)),
            (
                event_types::VARIANT_WHOLESALE_MODE_ENABLED,
                with_ids(
                    key,
                    json!({
                        "wholesale_price": 5000,
                        "min_qty_wholesale": 10,
                        "wholesale_discount": 300,
                        "wholesale_discount_type": "flat"
                    }),
                ),
            ),
        ],
    )
    .await;
    dispatcher.tick().await.unwrap();
    assert!(store.snapshot(key).await.unwrap().unwrap().has_wholesale_discount);

    append_all(
        &outbox,
        &[(event_types::VARIANT_WHOLESALE_MODE_DISABLED, variant_ids(key))],
    )
    .await;
    dispatcher.tick().await.unwrap();

    for row in [
        store.snapshot(key).await.unwrap().unwrap(),
        store.index_entry(key).await.unwrap().unwrap().variant,
    ] {
        assert!(!row.has_wholesale_enabled);
        assert!(!row.has_wholesale_discount);
        assert!(row.wholesale_price.is_none());
        assert!(row.wholesale_min_quantity.is_none());
        assert!(row.wholesale_discount.is_none());
        assert!(row.wholesale_discount_type.is_none());
    }
}

#[tokio::test]
async fn test_field_isolation_on_variant_info_update() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();

    append_all(&outbox, &[(event_types::VARIANT_CREATED, variant_created(key))]).await;
    dispatcher.tick().await.unwrap();
    let before = store.snapshot(key).await.unwrap().unwrap();

    append_all(
        &outbox,
        &[(
            event_types::VARIANT_INFO_UPDATED,
            with_ids(key, json!({"updated_fields": {"color": "blue"}})),
        )],
    )
    .await;
    dispatcher.tick().await.unwrap();
    let after = store.snapshot(key).await.unwrap().unwrap();

    assert_eq!(after.color.as_deref(), Some("blue"));
    let mut expected = before.clone();
    expected.color = Some("blue".to_string());
    expected.updated_at = after.updated_at;
    assert_eq!(after, expected);
    assert!(after.updated_at >= before.updated_at);
}

/// Every partial-update event type, ordered so each one lands on a row it
/// changes.
fn partial_updates(key: RowKey) -> Vec<(&'static str, Value)> {
    let product = json!({"product_id": key.product_id});
    let with_product = |fields: Value| {
        let mut payload = product.clone();
        if let (Some(target), Value::Object(fields)) = (payload.as_object_mut(), fields) {
            target.extend(fields);
        }
        payload
    };

    vec![
        (
            event_types::PRODUCT_INFO_UPDATED,
            with_product(json!({"updated_fields": {"title": "Trail Runner Pro"}})),
        ),
        (
            event_types::PRODUCT_IMAGE_ADDED,
            with_product(json!({"image_url": "https://cdn.example/a.png"})),
        ),
        (
            event_types::PRODUCT_IMAGE_UPDATED,
            with_product(json!({"image_url": "https://cdn.example/b.png"})),
        ),
        (
            event_types::PRODUCT_PROMO_VIDEO_ADDED,
            with_product(json!({"promo_video_url": "https://cdn.example/a.mp4"})),
        ),
        (
            event_types::PRODUCT_PROMO_VIDEO_UPDATED,
            with_product(json!({"promo_video_url": "https://cdn.example/b.mp4"})),
        ),
        (
            event_types::PRODUCT_CATEGORY_UPDATED,
            with_product(json!({"category_id": CategoryId::new(), "category_name": "Sale"})),
        ),
        (
            event_types::VARIANT_INFO_UPDATED,
            with_ids(key, json!({"updated_fields": {"size": "43"}})),
        ),
        (
            event_types::VARIANT_IN_STOCK_UPDATED,
            with_ids(key, json!({"in_stock": false})),
        ),
        (
            event_types::VARIANT_STOCK_QUANTITY_UPDATED,
            with_ids(key, json!({"stock_quantity": 3})),
        ),
        (
            event_types::VARIANT_RETAIL_PRICE_UPDATED,
            with_ids(key, json!({"retail_price": 9900})),
        ),
        (
            event_types::VARIANT_WEIGHT_UPDATED,
            with_ids(key, json!({"weight_grams": 400})),
        ),
        (
            event_types::VARIANT_RETAIL_DISCOUNT_ADDED,
            with_ids(
                key,
                json!({"retail_discount": 1000, "retail_discount_type": "percentage"}),
            ),
        ),
        (
            event_types::VARIANT_RETAIL_DISCOUNT_UPDATED,
            with_ids(key, json!({"updated_fields": {"retail_discount_type": "flat"}})),
        ),
        (event_types::VARIANT_RETAIL_DISCOUNT_REMOVED, variant_ids(key)),
        (
            event_types::VARIANT_WHOLESALE_MODE_ENABLED,
            with_ids(key, json!({"wholesale_price": 5000, "min_qty_wholesale": 10})),
        ),
        (
            event_types::VARIANT_WHOLESALE_MODE_UPDATED,
            with_ids(key, json!({"updated_fields": {"min_qty_wholesale": 20}})),
        ),
        (
            event_types::VARIANT_WHOLESALE_DISCOUNT_ADDED,
            with_ids(
                key,
                json!({"wholesale_discount": 300, "wholesale_discount_type": "flat"}),
            ),
        ),
        (
            event_types::VARIANT_WHOLESALE_DISCOUNT_UPDATED,
            with_ids(key, json!({"updated_fields": {"wholesale_discount": 250}})),
        ),
        (event_types::VARIANT_WHOLESALE_DISCOUNT_REMOVED, variant_ids(key)),
        (event_types::VARIANT_WHOLESALE_MODE_DISABLED, variant_ids(key)),
        (event_types::PRODUCT_IMAGE_REMOVED, product.clone()),
        (event_types::PRODUCT_PROMO_VIDEO_REMOVED, product.clone()),
        (event_types::VARIANT_ARCHIVED, variant_ids(key)),
        (event_types::PRODUCT_ARCHIVED, product.clone()),
    ]
}

/// Both rows for `key` with `updated_at` masked out.
async fn masked_rows(store: &InMemoryReadModelStore, key: RowKey) -> (VariantRow, IndexRow) {
    let mut snapshot = store.snapshot(key).await.unwrap().unwrap();
    let mut entry = store.index_entry(key).await.unwrap().unwrap();
    assert!(snapshot.flags_consistent(), "snapshot flags: {snapshot:?}");
    assert!(entry.variant.flags_consistent(), "index flags: {entry:?}");
    snapshot.updated_at = DateTime::<Utc>::default();
    entry.variant.updated_at = DateTime::<Utc>::default();
    (snapshot, entry)
}

#[tokio::test]
async fn test_partial_updates_are_idempotent() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();
    let updates = partial_updates(key);

    let covered: HashSet<&str> = updates.iter().map(|(event_type, _)| *event_type).collect();
    let expected: HashSet<&str> = event_types::ALL
        .iter()
        .copied()
        .filter(|t| *t != event_types::PRODUCT_CREATED && *t != event_types::VARIANT_CREATED)
        .collect();
    assert_eq!(covered, expected);
    assert_eq!(updates.len(), 24);

    append_all(&outbox, &[(event_types::VARIANT_CREATED, variant_created(key))]).await;
    dispatcher.tick().await.unwrap();
    masked_rows(&store, key).await;

    for (event_type, payload) in updates {
        append_all(&outbox, &[(event_type, payload.clone())]).await;
        let first = dispatcher.tick().await.unwrap();
        assert_eq!(first.dispatched, 1, "{event_type}: {first}");
        let once = masked_rows(&store, key).await;

        append_all(&outbox, &[(event_type, payload)]).await;
        let second = dispatcher.tick().await.unwrap();
        assert_eq!(second.dispatched, 1, "{event_type} replay: {second}");
        let twice = masked_rows(&store, key).await;

        assert_eq!(once, twice, "{event_type} is not idempotent");
    }

    let (snapshot, entry) = masked_rows(&store, key).await;
    assert!(snapshot.product_is_archived);
    assert!(snapshot.variant_is_archived);
    assert!(!snapshot.has_wholesale_enabled);
    assert_eq!(snapshot.retail_price.cents(), 9900);
    assert!(entry.variant.product_is_archived);
    assert_eq!(entry.variant.category_name, "Sale");
    assert!(projections::search::matches(&entry.search_document, "pro"));
}

#[tokio::test]
async fn test_orphaned_updates_do_not_starve_later_events() {
    let outbox = InMemoryOutboxStore::new();
    let store = InMemoryReadModelStore::with_outbox(outbox.clone());
    let dispatcher = Dispatcher::new(
        outbox.clone(),
        store.clone(),
        DispatcherConfig {
            batch_size: 2,
            missing_row_attempts: 3,
            ..DispatcherConfig::default()
        },
    );

    // The creation is rejected, so both stock updates target a row that
    // never exists and fill a whole batch ahead of the valid product.
    let orphaned = new_key();
    let valid = new_key();
    let mut duplicated = variant_created(orphaned);
    let fields = duplicated.as_object_mut().unwrap();
    let variant = fields.remove("variant").unwrap();
    fields.insert("variants".to_string(), json!([variant.clone(), variant]));
    append_all(
        &outbox,
        &[
            (event_types::PRODUCT_CREATED, duplicated),
            (
                event_types::VARIANT_IN_STOCK_UPDATED,
                with_ids(orphaned, json!({"in_stock": false})),
            ),
            (
                event_types::VARIANT_IN_STOCK_UPDATED,
                with_ids(orphaned, json!({"in_stock": true})),
            ),
            (event_types::VARIANT_CREATED, variant_created(valid)),
        ],
    )
    .await;

    let mut ticks = 0;
    while store.snapshot(valid).await.unwrap().is_none() {
        assert!(ticks < 10, "valid event still blocked after {ticks} ticks");
        dispatcher.tick().await.unwrap();
        ticks += 1;
    }

    assert_eq!(outbox.pending_count().await.unwrap(), 0);
    let parked = outbox
        .all_events()
        .await
        .into_iter()
        .filter(|event| event.failed_at.is_some())
        .count();
    assert_eq!(parked, 3);
    assert!(store.snapshot(orphaned).await.unwrap().is_none());
}

#[tokio::test]
async fn test_product_level_events_reach_every_variant() {
    let (outbox, store, dispatcher) = setup();
    let product_id = ProductId::new();
    let variants = [VariantId::new(), VariantId::new()];

    append_all(
        &outbox,
        &[
            (
                event_types::PRODUCT_CREATED,
                json!({
                    "seller": {"seller_id": SellerId::new(), "name": "Acme"},
                    "category": {"category_id": CategoryId::new(), "name": "Footwear"},
                    "product": {"product_id": product_id, "title": "Runner", "is_approved": true},
                    "variants": variants
                        .iter()
                        .map(|id| json!({"variant_id": id, "retail_price": 10000}))
                        .collect::<Vec<_>>()
                }),
            ),
            (
                event_types::PRODUCT_IMAGE_ADDED,
                json!({"product_id": product_id, "image_url": "https://cdn.example/a.png"}),
            ),
            (
                event_types::PRODUCT_CATEGORY_UPDATED,
                json!({
                    "product_id": product_id,
                    "category_id": CategoryId::new(),
                    "category_name": "Sale"
                }),
            ),
            (
                event_types::PRODUCT_INFO_UPDATED,
                json!({"product_id": product_id, "updated_fields": {"description": "Now waterproof"}}),
            ),
            (
                event_types::PRODUCT_IMAGE_REMOVED,
                json!({"product_id": product_id}),
            ),
        ],
    )
    .await;
    assert_eq!(dispatcher.tick().await.unwrap().dispatched, 5);

    let rows = store.snapshot_rows(product_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(row.image_url.is_none());
        assert_eq!(row.category_name, "Sale");
        assert_eq!(row.title, "Runner");
        assert_eq!(row.description, "Now waterproof");
    }
    for variant_id in variants {
        let entry = store
            .index_entry(RowKey::new(product_id, variant_id))
            .await
            .unwrap()
            .unwrap();
        assert!(projections::search::matches(&entry.search_document, "waterproof runner"));
    }
}

#[tokio::test]
async fn test_dispatched_at_is_set_exactly_once() {
    let (outbox, store, dispatcher) = setup();
    let key = new_key();
    append_all(&outbox, &[(event_types::VARIANT_CREATED, variant_created(key))]).await;
    let id = outbox.all_events().await[0].id;

    dispatcher.tick().await.unwrap();
    let first = outbox.get(id).await.unwrap().unwrap().dispatched_at;
    assert!(first.is_some());

    // Nothing left to claim; a second tick changes nothing.
    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.claimed, 0);
    assert_eq!(outbox.get(id).await.unwrap().unwrap().dispatched_at, first);
    assert_eq!(store.count(ReadModel::Snapshot).await.unwrap(), 1);
    assert_eq!(store.count(ReadModel::SearchIndex).await.unwrap(), 1);
}

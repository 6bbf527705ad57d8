//! Integration tests for decoding outbox payloads into catalog events.

use domain::{
    CatalogEvent, CategoryId, DecodeError, DiscountType, DomainEvent, ProductId, SellerId,
    VariantId, event_types,
};
use serde_json::{Value, json};

fn product_created(variants: Vec<Value>) -> Value {
    json!({
        "seller": {"seller_id": SellerId::new(), "name": "Acme Outdoor"},
        "category": {"category_id": CategoryId::new(), "name": "Footwear"},
        "product": {"product_id": ProductId::new(), "title": "Trail Runner"},
        "variants": variants
    })
}

#[test]
fn test_product_created_applies_defaults() {
    let payload = product_created(vec![json!({
        "variant_id": VariantId::new(),
        "retail_price": 12000
    })]);

    let Some(CatalogEvent::ProductCreated(created)) =
        CatalogEvent::decode(event_types::PRODUCT_CREATED, &payload).unwrap()
    else {
        panic!("expected a product creation");
    };

    assert_eq!(created.product.description, "");
    assert!(!created.product.is_archived);
    assert!(!created.seller.is_banned);
    assert_eq!(created.variants.len(), 1);
    assert_eq!(created.variants[0].retail_price.cents(), 12000);
    assert!(created.variants[0].wholesale_price.is_none());
}

#[test]
fn test_product_created_without_variants_is_invalid() {
    let err = CatalogEvent::decode(event_types::PRODUCT_CREATED, &product_created(vec![]))
        .unwrap_err();

    assert!(matches!(err, DecodeError::Invalid { .. }));
    assert_eq!(err.event_type(), event_types::PRODUCT_CREATED);
}

#[test]
fn test_duplicate_variant_ids_are_invalid() {
    let variant_id = VariantId::new();
    let payload = product_created(vec![
        json!({"variant_id": variant_id, "retail_price": 100}),
        json!({"variant_id": variant_id, "retail_price": 200}),
    ]);

    let err = CatalogEvent::decode(event_types::PRODUCT_CREATED, &payload).unwrap_err();
    assert!(matches!(err, DecodeError::Invalid { .. }));
}

#[test]
fn test_partial_update_keeps_absent_fields_absent() {
    let payload = json!({
        "product_id": ProductId::new(),
        "variant_id": VariantId::new(),
        "updated_fields": {"retail_discount": 500}
    });

    let Some(CatalogEvent::RetailDiscountUpdated(updated)) =
        CatalogEvent::decode(event_types::VARIANT_RETAIL_DISCOUNT_UPDATED, &payload).unwrap()
    else {
        panic!("expected a retail discount update");
    };

    assert_eq!(
        updated.updated_fields.retail_discount.map(|m| m.cents()),
        Some(500)
    );
    assert!(updated.updated_fields.retail_discount_type.is_none());
}

#[test]
fn test_wholesale_discount_without_type_is_invalid() {
    let payload = json!({
        "product_id": ProductId::new(),
        "variant_id": VariantId::new(),
        "wholesale_price": 5000,
        "min_qty_wholesale": 10,
        "wholesale_discount": 300
    });

    let err = CatalogEvent::decode(event_types::VARIANT_WHOLESALE_MODE_ENABLED, &payload)
        .unwrap_err();
    assert!(matches!(err, DecodeError::Invalid { .. }));
}

#[test]
fn test_wrong_field_type_is_malformed() {
    let payload = json!({
        "product_id": ProductId::new(),
        "variant_id": VariantId::new(),
        "in_stock": "yes"
    });

    let err = CatalogEvent::decode(event_types::VARIANT_IN_STOCK_UPDATED, &payload).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { .. }));
}

#[test]
fn test_unknown_type_decodes_to_none() {
    let decoded = CatalogEvent::decode("seller.banned", &json!({"anything": true})).unwrap();
    assert!(decoded.is_none());
}

#[test]
fn test_payload_survives_outbox_storage() {
    let payload = json!({
        "product_id": ProductId::new(),
        "variant_id": VariantId::new(),
        "retail_discount": 1500,
        "retail_discount_type": "percentage"
    });

    let event = CatalogEvent::decode(event_types::VARIANT_RETAIL_DISCOUNT_ADDED, &payload)
        .unwrap()
        .unwrap();
    assert_eq!(event.event_type(), event_types::VARIANT_RETAIL_DISCOUNT_ADDED);

    let CatalogEvent::RetailDiscountAdded(added) = &event else {
        panic!("expected a retail discount");
    };
    assert_eq!(added.retail_discount_type, DiscountType::Percentage);

    let stored = event.to_payload().unwrap();
    let reread = CatalogEvent::decode(event_types::VARIANT_RETAIL_DISCOUNT_ADDED, &stored)
        .unwrap()
        .unwrap();
    assert_eq!(reread, event);
}

//! Integration tests for `PromoRepo` against a real Postgres instance.

use saleradar_common::domain::{ChangeType, PromoVertical};
use saleradar_db::testutil::postgres_container;
use saleradar_db::{MessageRepo, PromoFields, PromoRepo, StoreRepo};

fn fields(headline: &str) -> PromoFields {
    PromoFields {
        headline: headline.to_string(),
        code: Some("SAVE25".to_string()),
        landing_url: None,
        percent_off: Some(25.0),
        amount_off: None,
        discount_text: None,
        vertical: PromoVertical::Retail,
        starts_at: None,
        ends_at: None,
    }
}

#[tokio::test]
async fn insert_change_if_new_enforces_uniqueness_at_the_database() {
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let messages = MessageRepo::new(pool.clone());
    let promos = PromoRepo::new(pool);

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    let message = messages
        .insert_if_new(Some(store.id), None, "msg-1", None, "body", "hash", None, &[])
        .await
        .unwrap()
        .unwrap();
    let promo = promos.create(store.id, "code:SAVE25", &fields("25% off")).await.unwrap();

    let first = promos
        .insert_change_if_new(promo.id, Some(message.id), ChangeType::DiscountChanged, serde_json::json!({"a": 1}))
        .await
        .unwrap();
    assert!(first.is_some());

    // Same (promo_id, message_id, change_type) triple, different diff payload
    // — the unique constraint, not the diff contents, is what dedups.
    let second = promos
        .insert_change_if_new(promo.id, Some(message.id), ChangeType::DiscountChanged, serde_json::json!({"a": 2}))
        .await
        .unwrap();
    assert!(second.is_none(), "a duplicate (promo, message, change_type) triple must not insert a second row");
}

#[tokio::test]
async fn mark_notified_sets_last_notified_at() {
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let promos = PromoRepo::new(pool);

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    let promo = promos.create(store.id, "code:SAVE25", &fields("25% off")).await.unwrap();
    assert!(promo.last_notified_at.is_none());

    promos.mark_notified(&[promo.id]).await.unwrap();

    let reloaded = promos.find_by_id(promo.id).await.unwrap().unwrap();
    assert!(reloaded.last_notified_at.is_some());
}

#[tokio::test]
async fn merging_same_extraction_twice_records_no_extra_changes() {
    // Idempotency of merge (property 2): re-applying identical fields must
    // not touch percent_off/amount_off/code and so must record zero further
    // PromoChange rows.
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let messages = MessageRepo::new(pool.clone());
    let promos = PromoRepo::new(pool);

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    let message = messages
        .insert_if_new(Some(store.id), None, "msg-1", None, "body", "hash", None, &[])
        .await
        .unwrap()
        .unwrap();

    let promo = promos.create(store.id, "code:SAVE25", &fields("25% off")).await.unwrap();
    promos
        .insert_change_if_new(promo.id, Some(message.id), ChangeType::Created, serde_json::json!({}))
        .await
        .unwrap();

    let same_fields = fields("25% off");
    let updated = promos.update_fields(promo.id, &same_fields, promo.status).await.unwrap();
    assert_eq!(updated.percent_off, promo.percent_off);
    assert_eq!(updated.code, promo.code);

    let changes = promos.changes_since(promo.first_seen_at - chrono::Duration::seconds(1)).await.unwrap();
    assert_eq!(changes.len(), 1, "no field actually changed, so only the original `created` change exists");
}

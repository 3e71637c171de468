//! Integration tests for `PromoMerger` against a real Postgres instance.

use saleradar_db::testutil::postgres_container;
use saleradar_db::{MessageRepo, PromoRepo, StoreRepo};
use saleradar_extract::ExtractedPromo;
use saleradar_pipeline::PromoMerger;

fn promo(headline: &str, percent_off: Option<f64>, amount_off: Option<f64>) -> ExtractedPromo {
    ExtractedPromo {
        headline: headline.to_string(),
        code: Some("SAVE".to_string()),
        landing_url: None,
        percent_off,
        amount_off,
        discount_text: None,
        vertical: "retail".to_string(),
        starts_at: None,
        ends_at: None,
        flight: None,
        confidence: 0.9,
    }
}

#[tokio::test]
async fn merging_the_same_candidate_twice_is_idempotent() {
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let messages = MessageRepo::new(pool.clone());
    let merger = PromoMerger::new(PromoRepo::new(pool));

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    let message = messages
        .insert_if_new(Some(store.id), None, "msg-1", None, "body", "hash", None, &[])
        .await
        .unwrap()
        .unwrap();

    let candidate = promo("20% off everything", Some(20.0), None);

    let first = merger.merge(store.id, message.id, &candidate).await.unwrap();
    assert!(first.created);
    assert_eq!(first.changes_recorded, 1, "a brand new promo records exactly one `created` change");

    let second = merger.merge(store.id, message.id, &candidate).await.unwrap();
    assert!(!second.created, "the same base key within the merge window must match the existing promo");
    assert_eq!(second.promo.id, first.promo.id);
    assert_eq!(second.changes_recorded, 0, "re-merging an unchanged candidate must record no further changes");
}

#[tokio::test]
async fn simultaneous_percent_and_amount_change_records_one_discount_changed_row() {
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let messages = MessageRepo::new(pool.clone());
    let merger = PromoMerger::new(PromoRepo::new(pool));

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    let message = messages
        .insert_if_new(Some(store.id), None, "msg-1", None, "body", "hash", None, &[])
        .await
        .unwrap()
        .unwrap();

    let original = promo("Storewide sale", Some(10.0), None);
    merger.merge(store.id, message.id, &original).await.unwrap();

    let changed = promo("Storewide sale", Some(20.0), Some(5.0));
    let outcome = merger.merge(store.id, message.id, &changed).await.unwrap();

    assert_eq!(
        outcome.changes_recorded, 1,
        "a single merge call changing both percent_off and amount_off must record one combined DiscountChanged row, not two"
    );
}

//! Integration tests for `DigestSelector` against a real Postgres instance.

use saleradar_common::domain::PromoVertical;
use saleradar_db::testutil::postgres_container;
use saleradar_db::{PromoFields, PromoRepo, RunRepo, StoreRepo};
use saleradar_pipeline::{DigestBadge, DigestSelector};

fn fields() -> PromoFields {
    PromoFields {
        headline: "20% off everything".to_string(),
        code: None,
        landing_url: None,
        percent_off: Some(20.0),
        amount_off: None,
        discount_text: None,
        vertical: PromoVertical::Retail,
        starts_at: None,
        ends_at: None,
    }
}

#[tokio::test]
async fn active_badge_respects_the_notification_cooldown() {
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let promos = PromoRepo::new(pool.clone());
    let selector = DigestSelector::new(promos.clone(), RunRepo::new(pool));

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    let promo = promos.create(store.id, "code:NONE", &fields()).await.unwrap();

    let since = chrono::Utc::now() - chrono::Duration::seconds(1);

    // No change recorded for this promo, so it's only ever a candidate for
    // the ACTIVE badge; never notified yet, so it's eligible.
    let first = selector.select(&[store.id], since, true, 7).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].badge, DigestBadge::Active);

    promos.mark_notified(&[promo.id]).await.unwrap();

    // Just notified; a same-day re-run within the 7-day cooldown must not
    // surface it again.
    let second = selector.select(&[store.id], since, true, 7).await.unwrap();
    assert!(second.is_empty(), "a promo notified moments ago must not reappear within its cooldown window");

    // With the cooldown window collapsed to zero days, the prior
    // notification is already outside it — the promo becomes eligible
    // again, mirroring what happens once real time has passed the cooldown.
    let third = selector.select(&[store.id], since, true, 0).await.unwrap();
    assert_eq!(third.len(), 1, "once the cooldown window has elapsed the promo is eligible again");
}

#[tokio::test]
async fn active_badge_is_suppressed_entirely_when_include_unchanged_is_false() {
    let (_container, pool) = postgres_container().await;
    let stores = StoreRepo::new(pool.clone());
    let promos = PromoRepo::new(pool.clone());
    let selector = DigestSelector::new(promos.clone(), RunRepo::new(pool));

    let store = stores.upsert_store("acme", "Acme", true).await.unwrap();
    promos.create(store.id, "code:NONE", &fields()).await.unwrap();

    let since = chrono::Utc::now() - chrono::Duration::seconds(1);
    let daily = selector.select(&[store.id], since, false, 7).await.unwrap();
    assert!(daily.is_empty(), "daily digests never include unchanged ACTIVE promos");
}

//! Integration tests for `RunRepo` against a real Postgres instance.

use chrono::Utc;
use saleradar_common::domain::{RunStatus, RunType};
use saleradar_db::testutil::postgres_container;
use saleradar_db::RunRepo;

#[tokio::test]
async fn start_reuses_a_failed_run_row_for_the_same_day() {
    let (_container, pool) = postgres_container().await;
    let runs = RunRepo::new(pool);
    let today = Utc::now().date_naive();

    let run = runs.start(RunType::Daily, today).await.unwrap().unwrap();
    runs.finish(run.id, RunStatus::Failed, serde_json::json!({}), false).await.unwrap();

    let retried = runs
        .start(RunType::Daily, today)
        .await
        .unwrap()
        .expect("a failed run with no digest sent must be reusable by a later attempt");
    assert_eq!(retried.id, run.id);
    assert_eq!(retried.status, RunStatus::Running);
}

#[tokio::test]
async fn start_refuses_to_reuse_a_run_that_already_sent_its_digest() {
    let (_container, pool) = postgres_container().await;
    let runs = RunRepo::new(pool);
    let today = Utc::now().date_naive();

    let run = runs.start(RunType::Daily, today).await.unwrap().unwrap();
    runs.finish(run.id, RunStatus::Success, serde_json::json!({}), true).await.unwrap();

    let second = runs.start(RunType::Daily, today).await.unwrap();
    assert!(second.is_none(), "send-once-per-day: a run whose digest already went out must not restart");
}

#[tokio::test]
async fn try_acquire_lock_is_exclusive_per_run_type() {
    let (_container, pool) = postgres_container().await;
    let runs = RunRepo::new(pool);

    let first = runs.try_acquire_lock(RunType::Daily).await.unwrap();
    assert!(first.is_some());

    let second = runs.try_acquire_lock(RunType::Daily).await.unwrap();
    assert!(second.is_none(), "a second concurrent attempt to start the same run type must not acquire the lock");

    let other_type = runs.try_acquire_lock(RunType::Weekly).await.unwrap();
    assert!(other_type.is_some(), "lock is scoped per run type, not global");
}

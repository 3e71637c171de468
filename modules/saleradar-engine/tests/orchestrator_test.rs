//! End-to-end smoke tests for `RunOrchestrator` against a real Postgres
//! instance, with an empty store catalog so no network-touching adapter
//! is ever actually invoked.

use chrono::Utc;
use saleradar_adapters::{BrowserAdapter, CategoryAdapter, JsonAdapter, RssAdapter, SitemapAdapter, TieredRouter};
use saleradar_db::testutil::postgres_container;
use saleradar_db::{MessageRepo, PromoRepo, RunRepo, SignalRepo, StoreRepo};
use saleradar_engine::RunOrchestrator;
use saleradar_extract::{ExtractionResult, FixtureExtractor, FlightPreferences};
use saleradar_fetch::{Fetcher, PayloadStore};
use saleradar_pipeline::{DesktopChannel, DigestSelector, MailboxIngestor, PromoMerger, SignalPersister, StoreCatalog};

async fn build_orchestrator(pool: sqlx::PgPool, tmp: &std::path::Path) -> RunOrchestrator {
    let store_repo = StoreRepo::new(pool.clone());
    let signal_repo = SignalRepo::new(pool.clone());
    let message_repo = MessageRepo::new(pool.clone());
    let promo_repo = PromoRepo::new(pool.clone());
    let run_repo = RunRepo::new(pool.clone());

    let payload_store = PayloadStore::new(signal_repo.clone(), tmp.to_path_buf(), 4096);
    let extract_payload_store = PayloadStore::new(signal_repo.clone(), tmp.to_path_buf(), 4096);

    let http = reqwest::Client::new();
    let router = TieredRouter::new(
        Box::new(SitemapAdapter::new(Fetcher::new(http.clone(), "test-agent".to_string()))),
        Box::new(RssAdapter::new(Fetcher::new(http.clone(), "test-agent".to_string()))),
        Box::new(JsonAdapter::new(Fetcher::new(http.clone(), "test-agent".to_string()))),
        Box::new(CategoryAdapter::new(Fetcher::new(http.clone(), "test-agent".to_string()))),
        Box::new(BrowserAdapter::new(Box::new(FailingRenderer))),
    );

    RunOrchestrator {
        catalog: StoreCatalog::new(store_repo),
        router,
        signal_persister: SignalPersister::new(signal_repo, message_repo.clone(), payload_store),
        messages: message_repo.clone(),
        extractor: Box::new(FixtureExtractor::new(ExtractionResult { is_promo_email: false, promos: vec![] })),
        flight_preferences: FlightPreferences::default(),
        merger: PromoMerger::new(promo_repo.clone()),
        promos: promo_repo.clone(),
        payloads: extract_payload_store,
        digest_selector: DigestSelector::new(promo_repo, run_repo.clone()),
        runs: run_repo,
        channels: vec![Box::new(DesktopChannel)],
        mailbox_reader: None,
        mailbox_ingestor: MailboxIngestor::new(message_repo),
        digest_archive_dir: tmp.to_path_buf(),
        max_emails_per_run: 200,
        digest_cooldown_days: 7,
    }
}

struct FailingRenderer;

#[async_trait::async_trait]
impl saleradar_adapters::PageRenderer for FailingRenderer {
    async fn render(&self, _url: &str) -> anyhow::Result<String> {
        anyhow::bail!("never invoked in this test: no stores, no sources")
    }
}

#[tokio::test]
async fn run_with_no_active_stores_completes_and_archives_a_preview() {
    let (_container, pool) = postgres_container().await;
    let tmp = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(pool, tmp.path()).await;

    let outcome = orchestrator
        .run(saleradar_common::domain::RunType::Daily, Utc::now().date_naive(), true)
        .await
        .unwrap();

    assert_eq!(outcome.stats.stores_processed, 0);
    assert_eq!(outcome.stats.digest_items, 0);
    assert!(!outcome.stats.digest_delivered);
    assert!(outcome.archive_path.unwrap().exists(), "dry run must still write a preview file");
}

#[tokio::test]
async fn run_is_idempotent_for_the_same_run_type_and_digest_date() {
    let (_container, pool) = postgres_container().await;
    let tmp = tempfile::tempdir().unwrap();
    let orchestrator = build_orchestrator(pool, tmp.path()).await;
    let digest_date = Utc::now().date_naive();

    let first = orchestrator.run(saleradar_common::domain::RunType::Daily, digest_date, false).await.unwrap();
    assert_eq!(first.stats.stores_processed, 0);

    // Re-running the same (run_type, digest_date) pair before any digest
    // was actually delivered must reuse the run row, not fail or double up.
    let second = orchestrator.run(saleradar_common::domain::RunType::Daily, digest_date, false).await.unwrap();
    assert_eq!(second.stats.stores_processed, 0);
}

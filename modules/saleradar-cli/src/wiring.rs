//! Wires `Config` into the concrete adapters/repos/orchestrator the
//! commands module drives. Kept separate from `commands.rs` so each
//! command stays a short, readable sequence of calls.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use saleradar_adapters::{BrowserAdapter, BrowserlessRenderer, CategoryAdapter, JsonAdapter, PageRenderer, RssAdapter, SitemapAdapter, TieredRouter};
use saleradar_common::Config;
use saleradar_db::{MessageRepo, PromoRepo, RunRepo, SignalRepo, StoreRepo};
use saleradar_engine::RunOrchestrator;
use saleradar_extract::{ClaudeExtractor, Extractor, FlightPreferences};
use saleradar_fetch::{Fetcher, PayloadStore};
use saleradar_pipeline::{ChatChannel, DesktopChannel, DigestSelector, FileMailboxReader, MailboxIngestor, MailboxReader, NotificationChannel, PromoMerger, SignalPersister, StoreCatalog};

pub async fn connect(config: &Config) -> Result<PgPool> {
    saleradar_db::connect(&config.database_url, config.database_max_connections).await
}

fn fetcher(config: &Config, http: &reqwest::Client) -> Fetcher {
    Fetcher::new(http.clone(), config.bot_user_agent.clone())
}

/// A renderer that always fails — used when `BROWSERLESS_URL` isn't
/// configured so the browser tier still participates in tier fallthrough
/// instead of panicking on construction.
struct UnconfiguredRenderer;

#[async_trait]
impl PageRenderer for UnconfiguredRenderer {
    async fn render(&self, _url: &str) -> Result<String> {
        anyhow::bail!("browser rendering is not configured (set BROWSERLESS_URL/BROWSERLESS_TOKEN)")
    }
}

pub fn build_router(config: &Config) -> TieredRouter {
    let renderer: Box<dyn PageRenderer> = match (&config.browserless_url, &config.browserless_token) {
        (Some(url), Some(token)) => Box::new(BrowserlessRenderer::new(url.clone(), token.clone())),
        _ => Box::new(UnconfiguredRenderer),
    };

    let http = reqwest::Client::new();
    TieredRouter::new(
        Box::new(SitemapAdapter::new(fetcher(config, &http))),
        Box::new(RssAdapter::new(fetcher(config, &http))),
        Box::new(JsonAdapter::new(fetcher(config, &http))),
        Box::new(CategoryAdapter::new(fetcher(config, &http))),
        Box::new(BrowserAdapter::new(renderer)),
    )
}

pub fn build_extractor(config: &Config) -> Result<Box<dyn Extractor>> {
    let api_key = config
        .anthropic_api_key
        .clone()
        .context("ANTHROPIC_API_KEY is required to extract promos")?;
    Ok(Box::new(ClaudeExtractor::new(api_key, config.extraction_model.clone())))
}

pub fn build_flight_preferences(config: &Config) -> Result<FlightPreferences> {
    let prefs = saleradar_common::config::PreferencesFile::load(&config.preferences_file)?;
    Ok(FlightPreferences {
        preferred_origins: prefs.preferred_origins,
        preferred_regions: prefs.preferred_regions,
        max_price_by_region: prefs.max_price_by_region,
    })
}

pub fn build_channels(config: &Config) -> Vec<Box<dyn NotificationChannel>> {
    let mut channels: Vec<Box<dyn NotificationChannel>> = vec![Box::new(DesktopChannel)];
    if let Some(webhook) = &config.chat_webhook_url {
        channels.push(Box::new(ChatChannel::new(webhook.clone())));
    }
    channels
}

pub fn build_mailbox_reader(config: &Config) -> Option<Box<dyn MailboxReader>> {
    let dir = config.payload_dir.join("mailbox");
    dir.exists().then(|| Box::new(FileMailboxReader::new(dir)) as Box<dyn MailboxReader>)
}

pub async fn build_orchestrator(config: &Config, pool: PgPool) -> Result<RunOrchestrator> {
    let store_repo = StoreRepo::new(pool.clone());
    let signal_repo = SignalRepo::new(pool.clone());
    let message_repo = MessageRepo::new(pool.clone());
    let promo_repo = PromoRepo::new(pool.clone());
    let run_repo = RunRepo::new(pool.clone());

    let payload_store = PayloadStore::new(signal_repo.clone(), config.payload_dir.clone(), config.payload_inline_threshold_bytes);
    let extract_payload_store = PayloadStore::new(signal_repo.clone(), config.payload_dir.clone(), config.payload_inline_threshold_bytes);

    Ok(RunOrchestrator {
        catalog: StoreCatalog::new(store_repo),
        router: build_router(config),
        signal_persister: SignalPersister::new(signal_repo, message_repo.clone(), payload_store),
        messages: message_repo.clone(),
        extractor: build_extractor(config)?,
        flight_preferences: build_flight_preferences(config)?,
        merger: PromoMerger::new(promo_repo.clone()),
        promos: promo_repo.clone(),
        payloads: extract_payload_store,
        digest_selector: DigestSelector::new(promo_repo, run_repo.clone()),
        runs: run_repo,
        channels: build_channels(config),
        mailbox_reader: build_mailbox_reader(config),
        mailbox_ingestor: MailboxIngestor::new(message_repo),
        digest_archive_dir: config.digest_archive_dir.clone(),
        max_emails_per_run: config.max_emails_per_run,
        digest_cooldown_days: config.digest_cooldown_days,
    })
}

//! RunOrchestrator: advisory-locked, per-(run_type,
//! digest_date) idempotent execution of the full ingest → extract →
//! merge → digest pipeline. Phases run in sequence; a phase's per-item
//! failures are logged and rolled into stats rather than aborting the
//! run. Only lock acquisition and run-row creation abort early.

use anyhow::Result;
use chrono::NaiveDate;
use saleradar_adapters::TieredRouter;
use saleradar_common::domain::{RunStatus, RunType, Store};
use saleradar_common::error::SaleradarError;
use saleradar_db::{MessageRepo, PromoRepo, RunRepo};
use saleradar_extract::{filter_flight_promos, filter_non_discount_promos, Extractor, ExtractionResult, FlightPreferences};
use saleradar_fetch::PayloadStore;
use saleradar_pipeline::{
    digest, DigestSelector, MailboxIngestor, MailboxReader, NotificationChannel, PromoMerger, SignalPersister, StoreCatalog,
};

use crate::stats::RunStats;

pub struct RunOrchestrator {
    pub catalog: StoreCatalog,
    pub router: TieredRouter,
    pub signal_persister: SignalPersister,
    pub messages: MessageRepo,
    pub extractor: Box<dyn Extractor>,
    pub flight_preferences: FlightPreferences,
    pub merger: PromoMerger,
    pub promos: PromoRepo,
    pub payloads: PayloadStore,
    pub digest_selector: DigestSelector,
    pub runs: RunRepo,
    pub channels: Vec<Box<dyn NotificationChannel>>,
    pub mailbox_reader: Option<Box<dyn MailboxReader>>,
    pub mailbox_ingestor: MailboxIngestor,
    pub digest_archive_dir: std::path::PathBuf,
    pub max_emails_per_run: i64,
    pub digest_cooldown_days: i64,
}

pub struct RunOutcome {
    pub stats: RunStats,
    pub digest_html: Option<String>,
    pub archive_path: Option<std::path::PathBuf>,
}

impl RunOrchestrator {
    pub async fn run(&self, run_type: RunType, digest_date: NaiveDate, dry_run: bool) -> Result<RunOutcome> {
        let Some(_lock) = self.runs.try_acquire_lock(run_type).await? else {
            return Err(SaleradarError::RunLockConflict.into());
        };

        let Some(run) = self.runs.start(run_type, digest_date).await? else {
            // Another run already owns this (run_type, digest_date) pair.
            // Re-running is a no-op, not an error — callers that want a
            // fresh digest for a new date pass a new date.
            tracing::info!(?run_type, %digest_date, "run already exists for this date, skipping");
            return Ok(RunOutcome {
                stats: RunStats::default(),
                digest_html: None,
                archive_path: None,
            });
        };

        let mut stats = RunStats::default();
        let since = self.digest_selector.last_digest_time(run_type).await?;
        let stores = self.catalog.active_stores().await?;

        if let Some(reader) = &self.mailbox_reader {
            self.run_mailbox_phase(reader.as_ref(), &stores).await;
        }

        self.run_ingest_phase(&stores, &mut stats).await;
        self.run_extract_phase(&mut stats).await;
        self.run_merge_phase(&mut stats).await;

        let store_ids: Vec<_> = stores.iter().map(|s| s.id).collect();
        // Weekly digests also surface still-live unchanged promos (subject
        // to the cooldown); daily digests only ever show NEW/UPDATED.
        let include_unchanged = run_type == RunType::Weekly;
        let items = self
            .digest_selector
            .select(&store_ids, since, include_unchanged, self.digest_cooldown_days)
            .await?;
        stats.digest_items = items.len() as u32;
        let rendered = digest::render(&items);

        let mut archive_path = None;
        if !dry_run && !items.is_empty() {
            stats.digest_delivered = digest::fan_out(&self.channels, &rendered).await;
            archive_path = self.write_archive(run_type, digest_date, &rendered.html)?;
            if stats.digest_delivered {
                let promo_ids: Vec<_> = items.iter().map(|i| i.promo.id).collect();
                self.promos.mark_notified(&promo_ids).await?;
            }
        } else if dry_run {
            archive_path = self.write_preview(&rendered.html)?;
        }

        self.runs
            .finish(run.id, RunStatus::Success, stats.to_json(), stats.digest_delivered && !dry_run)
            .await?;

        Ok(RunOutcome {
            stats,
            digest_html: Some(rendered.html),
            archive_path,
        })
    }

    async fn run_mailbox_phase(&self, reader: &dyn MailboxReader, stores: &[Store]) {
        let raw_messages = match reader.read_batch().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "mailbox read failed");
                return;
            }
        };
        if raw_messages.is_empty() {
            return;
        }

        let mut store_configs = Vec::with_capacity(stores.len());
        for store in stores {
            let configs = self.catalog.active_sources(store.id).await.unwrap_or_default();
            store_configs.push((store.clone(), configs));
        }

        if let Err(e) = self.mailbox_ingestor.ingest(&raw_messages, &store_configs).await {
            tracing::warn!(error = %e, "mailbox ingestion failed");
        }
    }

    async fn run_ingest_phase(&self, stores: &[Store], stats: &mut RunStats) {
        for store in stores {
            stats.stores_processed += 1;
            let configs = match self.catalog.active_sources(store.id).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = %e, store = %store.slug, "failed to load sources");
                    continue;
                }
            };
            stats.sources_attempted += configs.len() as u32;

            let results = self.router.run_store(&store.slug, &configs).await;
            for (config, result) in results {
                if !result.succeeded() && !result.not_modified {
                    stats.sources_failed += 1;
                }
                match self.signal_persister.persist(store, &config, &result).await {
                    Ok(new_count) => stats.signals_discovered += new_count as u32,
                    Err(e) => tracing::warn!(error = %e, store = %store.slug, "signal persistence failed"),
                }
            }
        }
    }

    async fn run_extract_phase(&self, stats: &mut RunStats) {
        if let Err(e) = self.messages.dedup_pending().await {
            tracing::warn!(error = %e, "dedup pre-pass failed");
        }

        let pending = match self.messages.messages_without_extraction(self.max_emails_per_run).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list pending messages");
                return;
            }
        };

        for message in pending {
            // `message.body_text` only holds the inline preview for
            // signal-originated messages; re-hydrate the full body from its
            // blob for extraction. Mailbox-originated messages have no
            // backing blob and already carry their full body inline.
            let full_body = match message.raw_signal_id {
                Some(raw_signal_id) => match self.payloads.load_for_signal(raw_signal_id).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(e) => {
                        tracing::warn!(error = %e, message_id = %message.id, "failed to rehydrate message body");
                        message.body_text.clone()
                    }
                },
                None => message.body_text.clone(),
            };
            let text = saleradar_extract::format_email_for_extraction(
                message.subject.as_deref(),
                &full_body,
                &message.top_links,
            );
            let mut result = match self.extractor.extract(&text).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, message_id = %message.id, "extraction failed");
                    if let Err(e) = self.messages.mark_extraction_error(message.id, &e.to_string()).await {
                        tracing::warn!(error = %e, message_id = %message.id, "failed to record extraction error");
                    }
                    continue;
                }
            };

            filter_non_discount_promos(&mut result);
            filter_flight_promos(&mut result, &self.flight_preferences);

            match serde_json::to_value(&result) {
                Ok(extracted) => {
                    if let Err(e) = self
                        .messages
                        .insert_extraction(message.id, result.is_promo_email, extracted, "extraction-model")
                        .await
                    {
                        tracing::warn!(error = %e, message_id = %message.id, "failed to persist extraction");
                        if let Err(e) = self.messages.mark_extraction_error(message.id, &e.to_string()).await {
                            tracing::warn!(error = %e, message_id = %message.id, "failed to record extraction error");
                        }
                        continue;
                    }
                    stats.messages_extracted += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, message_id = %message.id, "failed to serialize extraction");
                    if let Err(e) = self.messages.mark_extraction_error(message.id, &e.to_string()).await {
                        tracing::warn!(error = %e, message_id = %message.id, "failed to record extraction error");
                    }
                }
            }
        }
    }

    async fn run_merge_phase(&self, stats: &mut RunStats) {
        let pending = match self.messages.pending_promo_extractions(200).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list pending promo extractions");
                return;
            }
        };

        for (extraction, message) in pending {
            let Some(store_id) = message.store_id else { continue };
            let result: ExtractionResult = match serde_json::from_value(extraction.extracted) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, extraction_id = %extraction.id, "malformed extraction payload");
                    continue;
                }
            };

            for candidate in &result.promos {
                match self.merger.merge(store_id, message.id, candidate).await {
                    Ok(outcome) => {
                        if outcome.created {
                            stats.promos_created += 1;
                        } else {
                            stats.promos_updated += 1;
                        }
                        stats.changes_recorded += outcome.changes_recorded as u32;
                    }
                    Err(e) => tracing::warn!(error = %e, "promo merge failed"),
                }
            }
        }
    }

    fn write_archive(&self, run_type: RunType, digest_date: NaiveDate, html: &str) -> Result<Option<std::path::PathBuf>> {
        let subdir = match run_type {
            RunType::Daily => "daily",
            RunType::Weekly => "weekly",
        };
        let dir = self.digest_archive_dir.join(subdir);
        std::fs::create_dir_all(&dir)?;

        let mut path = dir.join(format!("{digest_date}.html"));
        let mut suffix = 1;
        while path.exists() {
            path = dir.join(format!("{digest_date}-{suffix}.html"));
            suffix += 1;
        }
        std::fs::write(&path, html)?;
        Ok(Some(path))
    }

    fn write_preview(&self, html: &str) -> Result<Option<std::path::PathBuf>> {
        std::fs::create_dir_all(&self.digest_archive_dir)?;
        let path = self.digest_archive_dir.join("digest_preview.html");
        std::fs::write(&path, html)?;
        Ok(Some(path))
    }
}

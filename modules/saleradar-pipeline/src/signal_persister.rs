//! Bridges discovered `SignalDraft`s to persisted `RawSignal`/`Message`
//! rows, deduping on content hash before anything reaches the extraction
//! queue.

use anyhow::Result;
use saleradar_adapters::{signal_key, SignalDraft, SourceResult};
use saleradar_common::domain::{SourceConfig, Store};
use saleradar_db::{MessageRepo, SignalRepo};
use saleradar_fetch::{content_hash, PayloadStore};
use tracing::info;

pub struct SignalPersister {
    signals: SignalRepo,
    messages: MessageRepo,
    payloads: PayloadStore,
}

impl SignalPersister {
    pub fn new(signals: SignalRepo, messages: MessageRepo, payloads: PayloadStore) -> Self {
        Self {
            signals,
            messages,
            payloads,
        }
    }

    /// Persists every signal in `result` for `config`/`store`, skipping
    /// ones whose `(store, signal_key, body_hash)` triple was already
    /// seen. Returns the count of genuinely new signals.
    pub async fn persist(&self, store: &Store, config: &SourceConfig, result: &SourceResult) -> Result<usize> {
        let mut new_count = 0;
        for draft in &result.signals {
            if self.persist_one(store, config, draft).await? {
                new_count += 1;
            }
        }
        info!(store = %store.slug, source_type = ?config.source_type, new_signals = new_count, "persisted signals");
        Ok(new_count)
    }

    async fn persist_one(&self, store: &Store, config: &SourceConfig, draft: &SignalDraft) -> Result<bool> {
        let body_hash = content_hash(&draft.body);
        let key = signal_key(config.source_type, draft, &store.slug, &body_hash);

        let blob = self.payloads.put(&draft.body, &draft.content_type).await?;

        let inserted = self
            .signals
            .insert_signal_if_new(
                config.id,
                store.id,
                &key,
                &body_hash,
                blob.id,
                draft.metadata.clone(),
                draft.etag.as_deref(),
                draft.last_modified.as_deref(),
            )
            .await?;

        let Some(raw_signal) = inserted else {
            return Ok(false);
        };

        // Only the inline preview goes on the message row; the Extractor
        // re-hydrates the full body from the blob via `raw_signal_id` when
        // it actually needs it.
        let body_text = self.payloads.inline_preview(&draft.body);
        let top_links: Vec<String> = draft.url.clone().into_iter().collect();
        self.messages
            .insert_if_new(
                Some(store.id),
                Some(raw_signal.id),
                &key,
                None,
                &body_text,
                &body_hash,
                None,
                &top_links,
            )
            .await?;

        Ok(true)
    }
}

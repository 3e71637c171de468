//! Inbound mailbox ingestion. Matches raw messages
//! against `mail_from_address`/`mail_from_domain` source configs and hands
//! matched messages to the same persistence path as adapter-origin
//! signals. OAuth/IMAP mailbox access is out of scope; the only production
//! `MailboxReader` reads a directory of `.eml`-derived plain records.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use saleradar_common::domain::{SourceConfig, SourceType, Store};
use saleradar_db::MessageRepo;
use saleradar_fetch::content_hash;

#[derive(Clone, Debug, Deserialize)]
pub struct RawMailMessage {
    pub source_message_id: String,
    pub from_address: String,
    pub subject: Option<String>,
    pub body_text: String,
    pub top_links: Vec<String>,
}

/// Supplies raw messages to ingest. Implementations own whatever
/// credential/transport concern applies (filesystem, IMAP, a provider
/// API) — the mailbox ingestion logic itself only needs an ordered batch.
#[async_trait]
pub trait MailboxReader: Send + Sync {
    async fn read_batch(&self) -> Result<Vec<RawMailMessage>>;
}

/// Reads `.eml`-derived records from a directory, one JSON file per
/// message. Used for local development and tests; production OAuth
/// mailbox polling is out of scope.
pub struct FileMailboxReader {
    dir: std::path::PathBuf,
}

impl FileMailboxReader {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl MailboxReader for FileMailboxReader {
    async fn read_batch(&self) -> Result<Vec<RawMailMessage>> {
        let mut out = Vec::new();
        if !self.dir.exists() {
            return Ok(out);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(entry.path())?;
            out.push(serde_json::from_str(&raw)?);
        }
        Ok(out)
    }
}

pub struct MailboxIngestor {
    messages: MessageRepo,
}

impl MailboxIngestor {
    pub fn new(messages: MessageRepo) -> Self {
        Self { messages }
    }

    /// Matches each raw message against `configs` (exact address first,
    /// then domain suffix) and persists a `Message` row attributed to the
    /// matched store. Unmatched messages are dropped — no catch-all store.
    pub async fn ingest(&self, raw_messages: &[RawMailMessage], stores: &[(Store, Vec<SourceConfig>)]) -> Result<usize> {
        let mut ingested = 0;
        for raw in raw_messages {
            let Some(store) = match_store(raw, stores) else {
                continue;
            };
            let body_hash = content_hash(raw.body_text.as_bytes());
            let from_domain = raw.from_address.split('@').next_back().map(str::to_lowercase);
            let inserted = self
                .messages
                .insert_if_new(
                    Some(store.id),
                    None,
                    &raw.source_message_id,
                    raw.subject.as_deref(),
                    &raw.body_text,
                    &body_hash,
                    from_domain.as_deref(),
                    &raw.top_links,
                )
                .await?;
            if inserted.is_some() {
                ingested += 1;
            }
        }
        Ok(ingested)
    }
}

fn match_store<'a>(raw: &RawMailMessage, stores: &'a [(Store, Vec<SourceConfig>)]) -> Option<&'a Store> {
    let from = raw.from_address.to_lowercase();
    let domain = from.split('@').next_back().unwrap_or("");

    for (store, configs) in stores {
        for config in configs {
            if !config.active {
                continue;
            }
            match config.source_type {
                SourceType::MailFromAddress => {
                    if config.url.as_deref().map(|a| a.to_lowercase()) == Some(from.clone()) {
                        return Some(store);
                    }
                }
                SourceType::MailFromDomain => {
                    if config.url.as_deref().map(|d| d.to_lowercase()).as_deref() == Some(domain) {
                        return Some(store);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn store(slug: &str) -> Store {
        Store {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: slug.to_string(),
            active: true,
            created_at: chrono::Utc::now(),
        }
    }

    fn source(store_id: Uuid, source_type: SourceType, url: &str) -> SourceConfig {
        SourceConfig {
            id: Uuid::new_v4(),
            store_id,
            source_type,
            tier: 0,
            url: Some(url.to_string()),
            config: json!({}),
            active: true,
            last_successful_run: None,
            failure_count: 0,
        }
    }

    #[test]
    fn matches_exact_address() {
        let acme = store("acme");
        let configs = vec![source(acme.id, SourceType::MailFromAddress, "deals@acme.com")];
        let stores = vec![(acme.clone(), configs)];
        let raw = RawMailMessage {
            source_message_id: "m1".to_string(),
            from_address: "Deals@Acme.com".to_string(),
            subject: None,
            body_text: String::new(),
            top_links: vec![],
        };
        assert_eq!(match_store(&raw, &stores).map(|s| s.slug.clone()), Some("acme".to_string()));
    }

    #[test]
    fn matches_domain_fallback() {
        let acme = store("acme");
        let configs = vec![source(acme.id, SourceType::MailFromDomain, "acme.com")];
        let stores = vec![(acme.clone(), configs)];
        let raw = RawMailMessage {
            source_message_id: "m2".to_string(),
            from_address: "no-reply@acme.com".to_string(),
            subject: None,
            body_text: String::new(),
            top_links: vec![],
        };
        assert_eq!(match_store(&raw, &stores).map(|s| s.slug.clone()), Some("acme".to_string()));
    }

    #[test]
    fn no_match_returns_none() {
        let acme = store("acme");
        let configs = vec![source(acme.id, SourceType::MailFromDomain, "acme.com")];
        let stores = vec![(acme.clone(), configs)];
        let raw = RawMailMessage {
            source_message_id: "m3".to_string(),
            from_address: "spam@other.com".to_string(),
            subject: None,
            body_text: String::new(),
            top_links: vec![],
        };
        assert!(match_store(&raw, &stores).is_none());
    }
}

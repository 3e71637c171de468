use async_trait::async_trait;
use serde_json::Value;

use saleradar_common::domain::SourceConfig;

/// One unit of discovered content before it's persisted as a `RawSignal`.
/// `url`/`metadata.id` feed `signal_key` construction.
#[derive(Clone, Debug)]
pub struct SignalDraft {
    pub url: Option<String>,
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: Value,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Outcome of a single adapter invocation against one `SourceConfig`.
#[derive(Debug, Default)]
pub struct SourceResult {
    pub signals: Vec<SignalDraft>,
    pub not_modified: bool,
    pub error: Option<String>,
}

impl SourceResult {
    pub fn success(signals: Vec<SignalDraft>) -> Self {
        Self {
            signals,
            not_modified: false,
            error: None,
        }
    }

    pub fn not_modified() -> Self {
        Self {
            signals: Vec::new(),
            not_modified: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            signals: Vec::new(),
            not_modified: false,
            error: Some(error.into()),
        }
    }

    /// A tier "succeeds" if it ran without error, whether or not it turned
    /// up anything new — an empty-but-healthy source must still
    /// short-circuit lower tiers.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A source-type-specific discovery strategy. One implementation per
/// `SourceType` tier (sitemap, rss, json, category, browser).
#[async_trait]
pub trait Adapter: Send + Sync {
    fn source_type(&self) -> saleradar_common::domain::SourceType;

    async fn discover(&self, config: &SourceConfig) -> SourceResult;

    /// Cheap reachability probe used by `sources debug`/`report`. Default
    /// implementation delegates to `discover` and reports success/failure;
    /// adapters with a lighter-weight check (e.g. HEAD request) may
    /// override it.
    async fn health_check(&self, config: &SourceConfig) -> bool {
        self.discover(config).await.succeeded()
    }
}

/// Builds the stable dedup key for a discovered signal:
/// `{source_type}:{sha256(base)[:16]}:{body_hash[:16]}`, where `base` is
/// the signal's URL, or its metadata id, or a per-store fallback.
pub fn signal_key(
    source_type: saleradar_common::domain::SourceType,
    draft: &SignalDraft,
    store_slug: &str,
    body_hash: &str,
) -> String {
    use sha2::{Digest, Sha256};

    let base = draft
        .url
        .clone()
        .or_else(|| {
            draft
                .metadata
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("{:?}:{store_slug}", source_type));

    let base_hash = hex::encode(Sha256::digest(base.as_bytes()));
    let type_str = match source_type {
        saleradar_common::domain::SourceType::Sitemap => "sitemap",
        saleradar_common::domain::SourceType::Rss => "rss",
        saleradar_common::domain::SourceType::Json => "json",
        saleradar_common::domain::SourceType::Category => "category",
        saleradar_common::domain::SourceType::Browser => "browser",
        saleradar_common::domain::SourceType::MailFromAddress => "mail_from_address",
        saleradar_common::domain::SourceType::MailFromDomain => "mail_from_domain",
    };
    format!("{type_str}:{}:{}", &base_hash[..16], &body_hash[..16.min(body_hash.len())])
}

use std::env;

use anyhow::{Context, Result};

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

/// Process-wide configuration, assembled from the environment once at
/// startup: every field is required or defaulted here, never re-read at
/// call sites.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub payload_dir: std::path::PathBuf,
    pub payload_inline_threshold_bytes: usize,
    pub bot_user_agent: String,
    pub ignore_robots: bool,
    pub extraction_model: String,
    pub anthropic_api_key: Option<String>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub chat_webhook_url: Option<String>,
    pub digest_archive_dir: std::path::PathBuf,
    pub stores_file: std::path::PathBuf,
    pub preferences_file: std::path::PathBuf,
    pub max_emails_per_run: i64,
    pub digest_cooldown_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required_env("DATABASE_URL"),
            database_max_connections: optional_env("DATABASE_MAX_CONNECTIONS", "10")
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            payload_dir: optional_env("PAYLOAD_DIR", "./payloads").into(),
            payload_inline_threshold_bytes: optional_env("PAYLOAD_INLINE_THRESHOLD_BYTES", "8192")
                .parse()
                .context("PAYLOAD_INLINE_THRESHOLD_BYTES must be a positive integer")?,
            bot_user_agent: optional_env(
                "BOT_USER_AGENT",
                "saleradar/0.1 (+https://example.invalid/bot)",
            ),
            ignore_robots: optional_env_bool("IGNORE_ROBOTS", false),
            extraction_model: optional_env("EXTRACTION_MODEL", "claude-3-5-sonnet-latest"),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            browserless_url: env::var("BROWSERLESS_URL").ok(),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            chat_webhook_url: env::var("CHAT_WEBHOOK_URL").ok(),
            digest_archive_dir: optional_env("DIGEST_ARCHIVE_DIR", "./digest_archive").into(),
            stores_file: optional_env("STORES_FILE", "./stores.yaml").into(),
            preferences_file: optional_env("PREFERENCES_FILE", "./preferences.yaml").into(),
            max_emails_per_run: optional_env("MAX_EMAILS_PER_RUN", "200")
                .parse()
                .context("MAX_EMAILS_PER_RUN must be a positive integer")?,
            digest_cooldown_days: optional_env("DIGEST_COOLDOWN_DAYS", "7")
                .parse()
                .context("DIGEST_COOLDOWN_DAYS must be a positive integer")?,
        })
    }

    /// Log configuration with sensitive values reduced to a presence check,
    /// never the value itself.
    pub fn log_redacted(&self) {
        tracing::info!(
            database_max_connections = self.database_max_connections,
            payload_dir = %self.payload_dir.display(),
            ignore_robots = self.ignore_robots,
            extraction_model = %self.extraction_model,
            anthropic_api_key_set = self.anthropic_api_key.is_some(),
            browserless_configured = self.browserless_url.is_some(),
            chat_webhook_configured = self.chat_webhook_url.is_some(),
            "loaded configuration",
        );
    }
}

/// Per-store catalog source file (`stores.yaml`).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoreCatalogFile {
    pub stores: Vec<StoreFileEntry>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoreFileEntry {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub sources: Vec<SourceFileEntry>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SourceFileEntry {
    pub source_type: String,
    pub tier: i32,
    pub url: Option<String>,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// User preferences (`preferences.yaml`): flight-filter allowlists
/// and digest store allowlist.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PreferencesFile {
    #[serde(default)]
    pub preferred_origins: Vec<String>,
    #[serde(default)]
    pub preferred_regions: Vec<String>,
    #[serde(default)]
    pub max_price_by_region: std::collections::HashMap<String, f64>,
    #[serde(default)]
    pub digest_store_allowlist: Vec<String>,
}

impl PreferencesFile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading preferences file {}", path.display()))?;
        serde_yaml::from_str(&raw).context("parsing preferences.yaml")
    }
}

impl StoreCatalogFile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading store catalog file {}", path.display()))?;
        serde_yaml::from_str(&raw).context("parsing stores.yaml")
    }
}

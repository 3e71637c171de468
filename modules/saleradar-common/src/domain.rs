use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StoreId = Uuid;
pub type SourceConfigId = Uuid;
pub type RawSignalId = Uuid;
pub type PayloadBlobId = Uuid;
pub type MessageId = Uuid;
pub type ExtractionId = Uuid;
pub type PromoId = Uuid;
pub type PromoChangeId = Uuid;
pub type RunId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Sitemap,
    Rss,
    Json,
    Category,
    Browser,
    MailFromAddress,
    MailFromDomain,
}

impl SourceType {
    /// Default tier for a source type when not overridden by catalog config.
    pub fn default_tier(self) -> i32 {
        match self {
            SourceType::Sitemap | SourceType::Rss => 1,
            SourceType::Json => 2,
            SourceType::Category => 3,
            SourceType::Browser => 4,
            SourceType::MailFromAddress | SourceType::MailFromDomain => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoStatus {
    Active,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoVertical {
    Flight,
    Retail,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    EndExtended,
    DiscountChanged,
    CodeAdded,
    CodeChanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Daily,
    Weekly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Success,
    Error,
    SkippedDuplicate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub slug: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceConfigId,
    pub store_id: StoreId,
    pub source_type: SourceType,
    pub tier: i32,
    pub url: Option<String>,
    pub config: serde_json::Value,
    pub active: bool,
    pub last_successful_run: Option<DateTime<Utc>>,
    pub failure_count: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawSignal {
    pub id: RawSignalId,
    pub source_config_id: SourceConfigId,
    pub store_id: StoreId,
    pub signal_key: String,
    pub body_hash: String,
    pub payload_blob_id: PayloadBlobId,
    pub metadata: serde_json::Value,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayloadBlob {
    pub id: PayloadBlobId,
    pub content_hash: String,
    pub content_type: String,
    pub byte_len: i64,
    pub inline_body: Option<Vec<u8>>,
    pub spill_path: Option<String>,
    pub compressed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub store_id: Option<StoreId>,
    pub raw_signal_id: Option<RawSignalId>,
    pub source_message_id: String,
    pub subject: Option<String>,
    pub body_text: String,
    pub body_hash: String,
    pub from_domain: Option<String>,
    pub top_links: Vec<String>,
    pub extraction_status: ExtractionStatus,
    pub extraction_error: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Extraction {
    pub id: ExtractionId,
    pub message_id: MessageId,
    pub is_promo_email: bool,
    pub extracted: serde_json::Value,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Promo {
    pub id: PromoId,
    pub store_id: StoreId,
    pub base_key: String,
    pub headline: String,
    pub code: Option<String>,
    pub landing_url: Option<String>,
    pub percent_off: Option<f64>,
    pub amount_off: Option<f64>,
    pub discount_text: Option<String>,
    pub vertical: PromoVertical,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: PromoStatus,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromoChange {
    pub id: PromoChangeId,
    pub promo_id: PromoId,
    pub message_id: Option<MessageId>,
    pub change_type: ChangeType,
    pub diff: serde_json::Value,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromoEmailLink {
    pub promo_id: PromoId,
    pub message_id: MessageId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub run_type: RunType,
    pub digest_date: chrono::NaiveDate,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub digest_sent_at: Option<DateTime<Utc>>,
    pub stats: serde_json::Value,
}

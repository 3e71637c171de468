use serde::{Deserialize, Serialize};

/// One promo candidate as returned by the extraction model for a single
/// message. Mirrors the JSON schema in the extraction system prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedPromo {
    pub headline: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub landing_url: Option<String>,
    #[serde(default)]
    pub percent_off: Option<f64>,
    #[serde(default)]
    pub amount_off: Option<f64>,
    #[serde(default)]
    pub discount_text: Option<String>,
    #[serde(default)]
    pub vertical: String,
    #[serde(default)]
    pub starts_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub ends_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Flight-specific fields, present only when `vertical == "flight"`.
    #[serde(default)]
    pub flight: Option<FlightDetails>,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlightDetails {
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub price_usd: Option<f64>,
}

/// Whole-message extraction result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub is_promo_email: bool,
    #[serde(default)]
    pub promos: Vec<ExtractedPromo>,
}

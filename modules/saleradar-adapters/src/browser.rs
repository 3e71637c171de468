//! Tier 4: rendered-page discovery via an external headless-browser
//! rendering service. Only reached when a category source set
//! `require_browser` (or a lower tier reported `require_browser` as its
//! failure reason) — rendering is the most expensive and slowest tier.

use async_trait::async_trait;
use serde_json::json;

use saleradar_common::domain::{SourceConfig, SourceType};
use saleradar_fetch::content_hash;

use crate::category::strip_noise_tags;
use crate::types::{Adapter, SignalDraft, SourceResult};

/// Thin client for the external rendering service. Modeled as a trait so
/// tests can substitute a canned response without a live service.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> anyhow::Result<String>;
}

pub struct BrowserlessRenderer {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl BrowserlessRenderer {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("static client config is valid"),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str) -> anyhow::Result<String> {
        let endpoint = format!("{}/content?token={}", self.base_url, self.token);
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("browserless render failed ({status}): {body}");
        }
        Ok(response.text().await?)
    }
}

pub struct BrowserAdapter {
    renderer: Box<dyn PageRenderer>,
}

impl BrowserAdapter {
    pub fn new(renderer: Box<dyn PageRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Adapter for BrowserAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Browser
    }

    async fn discover(&self, config: &SourceConfig) -> SourceResult {
        let Some(url) = &config.url else {
            return SourceResult::failure("browser source has no url");
        };

        let html = match self.renderer.render(url).await {
            Ok(html) => html,
            Err(e) => return SourceResult::failure(e.to_string()),
        };
        let cleaned = strip_noise_tags(&html);
        let body_hash = content_hash(cleaned.as_bytes());

        SourceResult::success(vec![SignalDraft {
            url: Some(url.clone()),
            body: cleaned.clone().into_bytes(),
            content_type: "text/html".to_string(),
            metadata: json!({ "rendered": true, "body_hash": body_hash }),
            etag: None,
            last_modified: None,
        }])
    }
}

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompt::SYSTEM_PROMPT;
use crate::schemas::ExtractionResult;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Invokes the external LLM extraction call. One production implementation
/// (`ClaudeExtractor`) and one deterministic test double
/// (`FixtureExtractor`) — the call itself is explicitly out of scope for
/// this crate's own correctness guarantees.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, message_text: &str) -> anyhow::Result<ExtractionResult>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    content: Vec<ChatContentBlock>,
}

#[derive(Deserialize)]
struct ChatContentBlock {
    text: String,
}

pub struct ClaudeExtractor {
    api_key: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl ClaudeExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl Extractor for ClaudeExtractor {
    async fn extract(&self, message_text: &str) -> anyhow::Result<ExtractionResult> {
        let url = format!("{}/messages", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            max_tokens: 2048,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage {
                role: "user",
                content: message_text,
            }],
        };

        debug!(model = %self.model, "extraction request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("extraction API error ({status}): {body}");
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .content
            .first()
            .map(|b| b.text.as_str())
            .ok_or_else(|| anyhow::anyhow!("extraction response had no content blocks"))?;

        serde_json::from_str(text).map_err(|e| anyhow::anyhow!("malformed extraction JSON: {e}"))
    }
}

/// Deterministic test double returning a fixed result regardless of input,
/// for pipeline tests that need an `Extractor` without a live API key.
pub struct FixtureExtractor {
    result: ExtractionResult,
}

impl FixtureExtractor {
    pub fn new(result: ExtractionResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    async fn extract(&self, _message_text: &str) -> anyhow::Result<ExtractionResult> {
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_extractor_returns_fixed_result() {
        let fixture = FixtureExtractor::new(ExtractionResult {
            is_promo_email: true,
            promos: vec![],
        });
        let result = fixture.extract("anything").await.unwrap();
        assert!(result.is_promo_email);
    }
}

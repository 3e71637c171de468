//! HTTP fetch with retries, conditional GET and a response size cap.
//! Backoff shape follows the pattern used elsewhere in the stack for
//! flaky external calls: exponential with jitter.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(2);

/// Default body cap for ordinary page/feed/JSON fetches.
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
/// Sitemaps run larger; adapters pass this explicitly for sitemap GETs.
pub const SITEMAP_MAX_BYTES: usize = 20 * 1024 * 1024;
/// Default per-request timeout when a call site doesn't need a tighter one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ConditionalHeaders {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

pub enum FetchOutcome {
    /// New or changed content.
    Fetched {
        body: Vec<u8>,
        content_type: String,
        etag: Option<String>,
        last_modified: Option<String>,
        truncated: bool,
    },
    /// Server confirmed no change (HTTP 304).
    NotModified,
}

pub struct Fetcher {
    http: reqwest::Client,
    user_agent: String,
}

impl Fetcher {
    pub fn new(http: reqwest::Client, user_agent: String) -> Self {
        Self { http, user_agent }
    }

    /// Fetches `url`, truncating the body at `max_bytes` rather than
    /// failing — callers that need the full body (e.g. a sitemap index)
    /// pass a larger cap instead of relying on truncation.
    pub async fn get(
        &self,
        url: &str,
        conditional: Option<&ConditionalHeaders>,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<FetchOutcome> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.try_get(url, conditional, max_bytes, timeout).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    if !is_transient(&e) {
                        return Err(e);
                    }
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("fetch failed with no recorded error")))
    }

    async fn try_get(
        &self,
        url: &str,
        conditional: Option<&ConditionalHeaders>,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<FetchOutcome> {
        let mut headers = HeaderMap::new();
        if let Some(c) = conditional {
            if let Some(etag) = &c.etag {
                headers.insert(IF_NONE_MATCH, etag.parse()?);
            }
            if let Some(lm) = &c.last_modified {
                headers.insert(IF_MODIFIED_SINCE, lm.parse()?);
            }
        }

        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        if !response.status().is_success() {
            bail!("GET {url} returned {}", response.status());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.context("reading response body")?;
        let truncated = body.len() > max_bytes;
        let body = if truncated {
            body[..max_bytes].to_vec()
        } else {
            body.to_vec()
        };

        Ok(FetchOutcome::Fetched {
            body,
            content_type,
            etag,
            last_modified,
            truncated,
        })
    }
}

fn backoff(attempt: u32) -> Duration {
    let base = RETRY_BASE * 3u32.pow(attempt);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..1000));
    base + jitter
}

fn is_transient(err: &anyhow::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("timed out")
        || msg.contains("timeout")
        || msg.contains("connection reset")
        || msg.contains("connection refused")
        || msg.contains("returned 408")
        || msg.contains("returned 425")
        || msg.contains("returned 429")
        || msg.contains("returned 500")
        || msg.contains("returned 502")
        || msg.contains("returned 503")
        || msg.contains("returned 504")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_error_detection() {
        assert!(is_transient(&anyhow::anyhow!("GET http://x returned 503 Service Unavailable")));
        assert!(is_transient(&anyhow::anyhow!("GET http://x returned 500 Internal Server Error")));
        assert!(is_transient(&anyhow::anyhow!("GET http://x returned 408 Request Timeout")));
        assert!(is_transient(&anyhow::anyhow!("GET http://x returned 425 Too Early")));
        assert!(is_transient(&anyhow::anyhow!("operation timed out")));
        assert!(!is_transient(&anyhow::anyhow!("GET http://x returned 404 Not Found")));
    }

    #[test]
    fn backoff_grows_with_attempt() {
        // Base component only (jitter adds 0-1000ms on top of either side).
        assert!(backoff(0) >= RETRY_BASE);
        assert!(backoff(1) >= RETRY_BASE * 3);
    }
}

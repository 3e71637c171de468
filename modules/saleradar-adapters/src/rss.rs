//! Tier 1: RSS/Atom feed discovery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use saleradar_common::constants::{RSS_MAX_AGE_DAYS, RSS_MAX_ITEMS};
use saleradar_common::domain::{SourceConfig, SourceType};
use saleradar_fetch::{content_hash, ConditionalHeaders, FetchOutcome, Fetcher, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};

use crate::types::{Adapter, SignalDraft, SourceResult};

pub struct RssAdapter {
    fetcher: Fetcher,
}

impl RssAdapter {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for RssAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }

    async fn discover(&self, config: &SourceConfig) -> SourceResult {
        let Some(url) = &config.url else {
            return SourceResult::failure("rss source has no url");
        };

        let conditional = ConditionalHeaders {
            etag: config
                .config
                .get("etag")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            last_modified: config
                .config
                .get("last_modified")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        let outcome = match self.fetcher.get(url, Some(&conditional), DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT).await {
            Ok(o) => o,
            Err(e) => return SourceResult::failure(e.to_string()),
        };

        let (body, etag, last_modified) = match outcome {
            FetchOutcome::NotModified => return SourceResult::not_modified(),
            FetchOutcome::Fetched {
                body,
                etag,
                last_modified,
                ..
            } => (body, etag, last_modified),
        };

        let feed = match feed_rs::parser::parse(body.as_slice()) {
            Ok(f) => f,
            Err(e) => return SourceResult::failure(format!("feed parse error: {e}")),
        };

        let cutoff = Utc::now() - chrono::Duration::days(RSS_MAX_AGE_DAYS);
        let mut entries: Vec<_> = feed
            .entries
            .into_iter()
            .filter(|e| {
                let published: Option<DateTime<Utc>> = e.published.or(e.updated);
                published.map(|p| p >= cutoff).unwrap_or(true)
            })
            .collect();

        entries.sort_by_key(|e| std::cmp::Reverse(e.published.or(e.updated)));
        entries.truncate(RSS_MAX_ITEMS);

        let signals = entries
            .into_iter()
            .filter_map(|entry| {
                let link = entry.links.first().map(|l| l.href.clone())?;
                let title = entry.title.map(|t| t.content).unwrap_or_default();
                let summary = entry.summary.map(|s| s.content).unwrap_or_default();
                let raw = format!("{title}\n{summary}\n{link}");
                let body_hash = content_hash(raw.as_bytes());
                Some(SignalDraft {
                    url: Some(link.clone()),
                    body: raw.into_bytes(),
                    content_type: "application/rss+item".to_string(),
                    metadata: json!({
                        "id": entry.id,
                        "title": title,
                        "summary": summary,
                        "body_hash": body_hash,
                    }),
                    etag: etag.clone(),
                    last_modified: last_modified.clone(),
                })
            })
            .collect();

        SourceResult::success(signals)
    }
}

/// Scans HTML for `<link type="application/(rss|atom)+xml">` tags and
/// resolves their `href` relative to `base_url`, used by `sources debug`
/// to suggest a feed URL when only a category page is configured.
pub fn discover_feed_urls(html: &str, base_url: &str) -> Vec<String> {
    use std::sync::OnceLock;

    static LINK_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = LINK_RE.get_or_init(|| {
        regex::Regex::new(
            r#"(?is)<link[^>]+type=["'](?:application/rss\+xml|application/atom\+xml)["'][^>]*>"#,
        )
        .expect("valid regex")
    });
    static HREF_RE: OnceLock<regex::Regex> = OnceLock::new();
    let href_re = HREF_RE.get_or_init(|| regex::Regex::new(r#"href=["']([^"']+)["']"#).expect("valid regex"));

    let base = url::Url::parse(base_url).ok();
    let mut found = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for link_tag in re.find_iter(html) {
        if let Some(caps) = href_re.captures(link_tag.as_str()) {
            let href = &caps[1];
            let resolved = base
                .as_ref()
                .and_then(|b| b.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| href.to_string());
            if seen.insert(resolved.clone()) {
                found.push(resolved);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_feed_urls_resolves_relative_href() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/feed.xml">
        </head></html>"#;
        let found = discover_feed_urls(html, "https://example.com/blog/");
        assert_eq!(found, vec!["https://example.com/feed.xml"]);
    }

    #[test]
    fn discover_feed_urls_dedups() {
        let html = r#"
            <link type="application/rss+xml" href="https://example.com/feed.xml">
            <link type="application/rss+xml" href="https://example.com/feed.xml">
        "#;
        let found = discover_feed_urls(html, "https://example.com/");
        assert_eq!(found.len(), 1);
    }
}

//! Tier 1: XML sitemap / sitemap-index discovery.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::json;

use saleradar_common::domain::{SourceConfig, SourceType};
use saleradar_fetch::{content_hash, ConditionalHeaders, FetchOutcome, Fetcher, DEFAULT_TIMEOUT, SITEMAP_MAX_BYTES};

use crate::types::{Adapter, SignalDraft, SourceResult};

const MAX_URLS_PER_SITEMAP: usize = 200;

pub struct SitemapAdapter {
    fetcher: Fetcher,
}

impl SitemapAdapter {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for SitemapAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Sitemap
    }

    async fn discover(&self, config: &SourceConfig) -> SourceResult {
        let Some(url) = &config.url else {
            return SourceResult::failure("sitemap source has no url");
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

        let outcome = match self.fetcher.get(url, Some(&conditional), SITEMAP_MAX_BYTES, DEFAULT_TIMEOUT).await {
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

        let urls = match parse_sitemap_urls(&body) {
            Ok(urls) => urls,
            Err(e) => return SourceResult::failure(format!("sitemap parse error: {e}")),
        };

        let signals = urls
            .into_iter()
            .take(MAX_URLS_PER_SITEMAP)
            .map(|loc| {
                let body_hash = content_hash(loc.as_bytes());
                SignalDraft {
                    url: Some(loc.clone()),
                    body: loc.clone().into_bytes(),
                    content_type: "text/uri-list".to_string(),
                    metadata: json!({ "loc": loc, "body_hash": body_hash }),
                    etag: etag.clone(),
                    last_modified: last_modified.clone(),
                }
            })
            .collect();

        SourceResult::success(signals)
    }
}

/// Parses `<urlset><url><loc>...` entries. When the document is a sitemap
/// index (`<sitemapindex>`), the nested `<loc>` child sitemaps are returned
/// as-is rather than recursively fetched — the tiered router treats each
/// discovered URL uniformly and a second pass will pick up index entries
/// that happen to point at pages rather than further indexes.
fn parse_sitemap_urls(xml: &[u8]) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"loc" => in_loc = true,
            Event::End(e) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Event::Text(t) if in_loc => {
                locs.push(t.unescape()?.into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(locs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urlset() {
        let xml = br#"<?xml version="1.0"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>https://example.com/sale/a</loc></url>
            <url><loc>https://example.com/sale/b</loc></url>
        </urlset>"#;
        let urls = parse_sitemap_urls(xml).unwrap();
        assert_eq!(urls, vec!["https://example.com/sale/a", "https://example.com/sale/b"]);
    }

    #[test]
    fn parses_sitemap_index() {
        let xml = br#"<sitemapindex>
            <sitemap><loc>https://example.com/sitemap-1.xml</loc></sitemap>
        </sitemapindex>"#;
        let urls = parse_sitemap_urls(xml).unwrap();
        assert_eq!(urls, vec!["https://example.com/sitemap-1.xml"]);
    }
}

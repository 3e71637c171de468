//! Tier 3: category/listing page scraping. Fetches one HTML page, strips
//! chrome, and extracts per-product "sale card" candidates via CSS
//! selectors — a deliberate departure from markdown-readability extraction:
//! product price/discount data lives in structured DOM attributes a
//! readability pass would flatten away.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::json;

use saleradar_common::domain::{SourceConfig, SourceType};
use saleradar_fetch::{content_hash, ConditionalHeaders, FetchOutcome, Fetcher, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};

use crate::types::{Adapter, SignalDraft, SourceResult};

/// Tags stripped before a page's text is handed to extraction — none of
/// these carry offer content.
const STRIP_TAGS: &[&str] = &["script", "style", "nav", "footer", "noscript", "svg"];

pub struct CategoryAdapter {
    fetcher: Fetcher,
}

impl CategoryAdapter {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for CategoryAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Category
    }

    async fn discover(&self, config: &SourceConfig) -> SourceResult {
        let Some(url) = &config.url else {
            return SourceResult::failure("category source has no url");
        };
        let card_selector = config
            .config
            .get("card_selector")
            .and_then(|v| v.as_str())
            .unwrap_or("body");

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

        let html = String::from_utf8_lossy(&body).into_owned();
        let cleaned = strip_noise_tags(&html);
        let cards = match extract_sale_cards(&cleaned, card_selector, url) {
            Ok(cards) => cards,
            Err(e) => return SourceResult::failure(format!("selector error: {e}")),
        };

        if cards.is_empty() {
            return SourceResult::failure("require_browser".to_string());
        }

        let signals = cards
            .into_iter()
            .map(|card| {
                let body_hash = content_hash(card.text.as_bytes());
                SignalDraft {
                    url: card.link.clone(),
                    body: card.text.clone().into_bytes(),
                    content_type: "text/html".to_string(),
                    metadata: json!({
                        "text": card.text,
                        "price_text": card.price_text,
                        "body_hash": body_hash,
                    }),
                    etag: etag.clone(),
                    last_modified: last_modified.clone(),
                }
            })
            .collect();

        SourceResult::success(signals)
    }
}

struct SaleCard {
    text: String,
    link: Option<String>,
    price_text: Option<String>,
}

/// Removes tag content irrelevant to offer extraction (scripts, nav chrome)
/// so downstream text processing isn't polluted by boilerplate.
pub fn strip_noise_tags(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = html.to_string();
    for tag in STRIP_TAGS {
        let selector = Selector::parse(tag).expect("static selector is valid");
        for el in document.select(&selector) {
            out = out.replace(&el.html(), "");
        }
    }
    out
}

/// Product-card extraction (spec's SalePageParser): each matched element's
/// text, first link, and best-guess price/discount text.
fn extract_sale_cards(html: &str, card_selector: &str, base_url: &str) -> anyhow::Result<Vec<SaleCard>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(card_selector).map_err(|e| anyhow::anyhow!("{e:?}"))?;
    let link_selector = Selector::parse("a").expect("static selector is valid");
    let price_selector =
        Selector::parse("[class*=price],[class*=Price],[class*=sale],[class*=Sale],[class*=discount]")
            .expect("static selector is valid");
    let base = url::Url::parse(base_url).ok();

    let cards = document
        .select(&selector)
        .map(|el| {
            let text = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
            let link = el
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| {
                    base.as_ref()
                        .and_then(|b| b.join(href).ok())
                        .map(|u| u.to_string())
                        .or_else(|| Some(href.to_string()))
                });
            let price_text = el
                .select(&price_selector)
                .next()
                .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string());
            SaleCard { text, link, price_text }
        })
        .filter(|c| !c.text.is_empty())
        .collect();

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let html = "<html><body><script>alert(1)</script><p>Sale 20% off</p></body></html>";
        let stripped = strip_noise_tags(html);
        assert!(!stripped.contains("alert"));
        assert!(stripped.contains("Sale 20% off"));
    }

    #[test]
    fn extracts_card_text_link_and_price() {
        let html = r#"<html><body>
            <div class="product-card">
                <a href="/items/1">Winter Jacket</a>
                <span class="price-sale">$49.99</span>
            </div>
        </body></html>"#;
        let cards = extract_sale_cards(html, ".product-card", "https://example.com/cat/").unwrap();
        assert_eq!(cards.len(), 1);
        assert!(cards[0].text.contains("Winter Jacket"));
        assert_eq!(cards[0].link.as_deref(), Some("https://example.com/items/1"));
        assert_eq!(cards[0].price_text.as_deref(), Some("$49.99"));
    }

    #[test]
    fn empty_selector_match_yields_no_cards() {
        let html = "<html><body><p>nothing here</p></body></html>";
        let cards = extract_sale_cards(html, ".product-card", "https://example.com/").unwrap();
        assert!(cards.is_empty());
    }
}

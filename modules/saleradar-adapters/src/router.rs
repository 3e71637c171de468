//! Tiered dispatch: for each store, try configured sources in ascending
//! tier order and stop at the first tier that produces a healthy result.
//! A tier "succeeds" (and short-circuits the rest) the moment any of its
//! sources turns up at least one new signal — a source that's merely
//! reachable but empty, or a 304, is not enough: the router's job is to
//! find new content, and an empty tier-1 scrape must still let tier 2+
//! have a try.

use std::collections::BTreeMap;

use saleradar_common::domain::{SourceConfig, SourceType};
use tracing::{info, warn};

use crate::types::{Adapter, SourceResult};

pub struct TieredRouter {
    sitemap: Box<dyn Adapter>,
    rss: Box<dyn Adapter>,
    json: Box<dyn Adapter>,
    category: Box<dyn Adapter>,
    browser: Box<dyn Adapter>,
}

impl TieredRouter {
    pub fn new(
        sitemap: Box<dyn Adapter>,
        rss: Box<dyn Adapter>,
        json: Box<dyn Adapter>,
        category: Box<dyn Adapter>,
        browser: Box<dyn Adapter>,
    ) -> Self {
        Self {
            sitemap,
            rss,
            json,
            category,
            browser,
        }
    }

    fn adapter_for(&self, source_type: SourceType) -> Option<&dyn Adapter> {
        match source_type {
            SourceType::Sitemap => Some(self.sitemap.as_ref()),
            SourceType::Rss => Some(self.rss.as_ref()),
            SourceType::Json => Some(self.json.as_ref()),
            SourceType::Category => Some(self.category.as_ref()),
            SourceType::Browser => Some(self.browser.as_ref()),
            SourceType::MailFromAddress | SourceType::MailFromDomain => None,
        }
    }

    /// Runs a single store's configured sources, tier by tier, and returns
    /// the `(SourceConfig, SourceResult)` pairs that actually ran. The
    /// first tier whose sources all succeed stops the sweep; lower tiers
    /// never run. A `category` tier result carrying the sentinel error
    /// `"require_browser"` auto-escalates to the browser tier before
    /// giving up on the store for this run.
    pub async fn run_store(&self, store_slug: &str, configs: &[SourceConfig]) -> Vec<(SourceConfig, SourceResult)> {
        let mut by_tier: BTreeMap<i32, Vec<&SourceConfig>> = BTreeMap::new();
        for c in configs {
            if c.active && self.adapter_for(c.source_type).is_some() {
                by_tier.entry(c.tier).or_default().push(c);
            }
        }

        let mut results = Vec::new();
        for (tier, tier_configs) in by_tier {
            let mut tier_succeeded = false;
            for config in tier_configs {
                let adapter = self.adapter_for(config.source_type).expect("filtered above");
                let result = adapter.discover(config).await;

                if !result.signals.is_empty() {
                    info!(store = store_slug, tier, source_type = ?config.source_type, signals = result.signals.len(), "tier source succeeded");
                    tier_succeeded = true;
                } else if result.error.as_deref() == Some("require_browser") {
                    warn!(store = store_slug, tier, "category tier requires browser escalation");
                    let browser_result = self.browser.discover(config).await;
                    if !browser_result.signals.is_empty() {
                        tier_succeeded = true;
                    }
                    results.push((config.clone(), browser_result));
                    continue;
                } else if result.succeeded() || result.not_modified {
                    info!(store = store_slug, tier, source_type = ?config.source_type, "tier source reachable but empty, trying next tier");
                } else {
                    warn!(store = store_slug, tier, source_type = ?config.source_type, error = ?result.error, "tier source failed");
                }
                results.push((config.clone(), result));
            }
            if tier_succeeded {
                break;
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::types::SignalDraft;

    struct FixedAdapter {
        kind: SourceType,
        result_fn: fn() -> SourceResult,
    }

    #[async_trait]
    impl Adapter for FixedAdapter {
        fn source_type(&self) -> SourceType {
            self.kind
        }

        async fn discover(&self, _config: &SourceConfig) -> SourceResult {
            (self.result_fn)()
        }
    }

    fn config(source_type: SourceType, tier: i32) -> SourceConfig {
        SourceConfig {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            source_type,
            tier,
            url: Some("https://example.com".to_string()),
            config: json!({}),
            active: true,
            last_successful_run: None,
            failure_count: 0,
        }
    }

    fn draft() -> SignalDraft {
        SignalDraft {
            url: Some("https://example.com/x".to_string()),
            body: b"x".to_vec(),
            content_type: "text/plain".to_string(),
            metadata: json!({}),
            etag: None,
            last_modified: None,
        }
    }

    #[tokio::test]
    async fn tier_success_short_circuits_lower_tiers() {
        let router = TieredRouter::new(
            Box::new(FixedAdapter {
                kind: SourceType::Sitemap,
                result_fn: || SourceResult::success(vec![draft()]),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Rss,
                result_fn: || panic!("rss should not run"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Json,
                result_fn: || panic!("json should not run"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Category,
                result_fn: || panic!("category should not run"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Browser,
                result_fn: || panic!("browser should not run"),
            }),
        );

        let configs = vec![
            config(SourceType::Sitemap, 1),
            config(SourceType::Json, 2),
            config(SourceType::Category, 3),
        ];
        let results = router.run_store("acme", &configs).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.source_type, SourceType::Sitemap);
    }

    #[tokio::test]
    async fn tier_failure_falls_through_to_next_tier() {
        let router = TieredRouter::new(
            Box::new(FixedAdapter {
                kind: SourceType::Sitemap,
                result_fn: || SourceResult::failure("boom"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Rss,
                result_fn: || panic!("rss should not run"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Json,
                result_fn: || SourceResult::success(vec![draft()]),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Category,
                result_fn: || panic!("category should not run"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Browser,
                result_fn: || panic!("browser should not run"),
            }),
        );

        let configs = vec![config(SourceType::Sitemap, 1), config(SourceType::Json, 2)];
        let results = router.run_store("acme", &configs).await;
        assert_eq!(results.len(), 2);
        assert!(results[1].1.succeeded());
    }

    #[tokio::test]
    async fn require_browser_escalates() {
        let router = TieredRouter::new(
            Box::new(FixedAdapter {
                kind: SourceType::Sitemap,
                result_fn: || SourceResult::failure("no sitemap"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Rss,
                result_fn: || SourceResult::failure("no feed"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Json,
                result_fn: || SourceResult::failure("no json endpoint"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Category,
                result_fn: || SourceResult::failure("require_browser"),
            }),
            Box::new(FixedAdapter {
                kind: SourceType::Browser,
                result_fn: || SourceResult::success(vec![draft()]),
            }),
        );

        let configs = vec![
            config(SourceType::Sitemap, 1),
            config(SourceType::Rss, 1),
            config(SourceType::Json, 2),
            config(SourceType::Category, 3),
        ];
        let results = router.run_store("acme", &configs).await;
        let browser_result = results.iter().find(|(c, _)| c.source_type == SourceType::Category);
        assert!(browser_result.unwrap().1.succeeded());
    }
}

//! Tier 2: JSON endpoint discovery. Stores exposing a promos/deals API
//! configure a JSON-pointer-ish path to an array plus a field mapping;
//! each array element becomes one signal.

use async_trait::async_trait;
use serde_json::{json, Value};

use saleradar_common::domain::{SourceConfig, SourceType};
use saleradar_fetch::{content_hash, ConditionalHeaders, FetchOutcome, Fetcher, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};

use crate::types::{Adapter, SignalDraft, SourceResult};

pub struct JsonAdapter {
    fetcher: Fetcher,
}

impl JsonAdapter {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Adapter for JsonAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Json
    }

    async fn discover(&self, config: &SourceConfig) -> SourceResult {
        let Some(url) = &config.url else {
            return SourceResult::failure("json source has no url");
        };
        let items_path = config
            .config
            .get("items_path")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let id_field = config.config.get("id_field").and_then(|v| v.as_str());
        let url_field = config
            .config
            .get("url_field")
            .and_then(|v| v.as_str())
            .unwrap_or("url");

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

        let root: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => return SourceResult::failure(format!("json parse error: {e}")),
        };

        let items = resolve_path(&root, items_path);
        let Some(items) = items.as_array() else {
            return SourceResult::failure("items_path did not resolve to an array");
        };

        let signals = items
            .iter()
            .map(|item| {
                let raw = serde_json::to_vec(item).unwrap_or_default();
                let body_hash = content_hash(&raw);
                let url = item.get(url_field).and_then(|v| v.as_str()).map(str::to_string);
                let id = id_field.and_then(|f| item.get(f)).cloned();
                SignalDraft {
                    url,
                    body: raw,
                    content_type: "application/json".to_string(),
                    metadata: json!({ "id": id, "body_hash": body_hash, "item": item }),
                    etag: etag.clone(),
                    last_modified: last_modified.clone(),
                }
            })
            .collect();

        SourceResult::success(signals)
    }
}

/// Resolves a dotted path like `"data.promos"` against a JSON value. An
/// empty path returns the root unchanged (the common case: the endpoint's
/// body is itself the array).
fn resolve_path<'a>(root: &'a Value, path: &str) -> &'a Value {
    if path.is_empty() {
        return root;
    }
    let mut current = root;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return &Value::Null,
        }
    }
    current
}

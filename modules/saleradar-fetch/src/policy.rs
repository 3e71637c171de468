//! robots.txt policy gating. Fails closed: any error fetching or parsing a
//! domain's robots.txt is treated as "disallow everything" for that domain
//! until `ignore_robots` is set.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use texting_robots::Robot;
use url::Url;

enum CachedPolicy {
    Robot(Robot),
    FetchFailed,
}

pub struct PolicyGate {
    http: reqwest::Client,
    user_agent: String,
    ignore_robots: bool,
    cache: Mutex<HashMap<String, CachedPolicy>>,
}

impl PolicyGate {
    pub fn new(http: reqwest::Client, user_agent: String, ignore_robots: bool) -> Self {
        Self {
            http,
            user_agent,
            ignore_robots,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `url` may be fetched. Always `true` when
    /// `ignore_robots` is set (operator override for trusted sources).
    pub async fn allowed(&self, url: &str) -> Result<bool> {
        if self.ignore_robots {
            return Ok(true);
        }
        let parsed = Url::parse(url)?;
        let Some(host) = parsed.host_str() else {
            return Ok(false);
        };
        let origin = format!("{}://{}", parsed.scheme(), host);

        if let Some(cached) = self.cached_result(&origin, url) {
            return Ok(cached);
        }

        let robots_url = format!("{origin}/robots.txt");
        let fetched = self.http.get(&robots_url).send().await;
        let mut cache = self.cache.lock().expect("policy cache mutex poisoned");
        match fetched {
            Ok(resp) if resp.status().is_success() => {
                let bytes = resp.bytes().await.unwrap_or_default();
                match Robot::new(&self.user_agent, bytes.as_ref()) {
                    Ok(robot) => {
                        let allowed = robot.allowed(url);
                        cache.insert(origin, CachedPolicy::Robot(robot));
                        Ok(allowed)
                    }
                    Err(_) => {
                        cache.insert(origin, CachedPolicy::FetchFailed);
                        Ok(false)
                    }
                }
            }
            // No robots.txt (404) is treated as "allow everything", matching
            // standard crawler convention.
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                let robot = Robot::new(&self.user_agent, b"").expect("empty robots.txt parses");
                let allowed = robot.allowed(url);
                cache.insert(origin, CachedPolicy::Robot(robot));
                Ok(allowed)
            }
            _ => {
                cache.insert(origin, CachedPolicy::FetchFailed);
                Ok(false)
            }
        }
    }

    fn cached_result(&self, origin: &str, url: &str) -> Option<bool> {
        let cache = self.cache.lock().expect("policy cache mutex poisoned");
        match cache.get(origin)? {
            CachedPolicy::Robot(robot) => Some(robot.allowed(url)),
            CachedPolicy::FetchFailed => Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ignore_robots_allows_everything() {
        let gate = PolicyGate::new(reqwest::Client::new(), "testbot".into(), true);
        assert!(gate.allowed("https://example.invalid/anything").await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_domain_fails_closed() {
        let gate = PolicyGate::new(reqwest::Client::new(), "testbot".into(), false);
        let allowed = gate
            .allowed("https://this-domain-does-not-exist.invalid/x")
            .await
            .unwrap();
        assert!(!allowed);
    }
}

//! Per-domain request pacing. A run-local gate: not shared across
//! processes, so it paces our own concurrency rather than acting as a
//! global rate limiter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateGate {
    min_interval: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Sleeps as needed so that two requests to the same domain are never
    /// closer together than `min_interval`, then records the new time.
    pub async fn wait_for(&self, domain: &str) {
        let sleep_for = {
            let mut guard = self.last_request.lock().expect("rate gate mutex poisoned");
            let now = Instant::now();
            let sleep_for = guard
                .get(domain)
                .map(|last| self.min_interval.saturating_sub(now.duration_since(*last)))
                .unwrap_or_default();
            guard.insert(domain.to_string(), now + sleep_for);
            sleep_for
        };
        if !sleep_for.is_zero() {
            tokio::time::sleep(sleep_for).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_request_to_same_domain_is_delayed() {
        let gate = RateGate::new(Duration::from_millis(50));
        let start = Instant::now();
        gate.wait_for("example.com").await;
        gate.wait_for("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn different_domains_do_not_block_each_other() {
        let gate = RateGate::new(Duration::from_secs(5));
        let start = Instant::now();
        gate.wait_for("a.example.com").await;
        gate.wait_for("b.example.com").await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}

//! Per-run request budget. A run stops issuing new fetches once the cap is
//! hit; in-flight requests are allowed to finish.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks requests spent against a per-run cap. `None` cap means unlimited.
pub struct RequestBudget {
    max_requests: Option<u64>,
    spent: AtomicU64,
}

impl RequestBudget {
    pub fn new(max_requests: Option<u64>) -> Self {
        Self {
            max_requests,
            spent: AtomicU64::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn has_budget(&self) -> bool {
        match self.max_requests {
            None => true,
            Some(max) => self.spent.load(Ordering::Relaxed) < max,
        }
    }

    /// Attempts to reserve one request. Returns `false` (without rolling
    /// back the spend counter) once the cap is reached, matching the
    /// fetch-then-check pattern used elsewhere in the stack: budget counts
    /// intent, not completion.
    pub fn start_request(&self) -> bool {
        let spent = self.spent.fetch_add(1, Ordering::Relaxed) + 1;
        match self.max_requests {
            None => true,
            Some(max) => spent <= max,
        }
    }

    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> Option<u64> {
        self.max_requests
            .map(|max| max.saturating_sub(self.spent.load(Ordering::Relaxed)))
    }

    pub fn log_status(&self) {
        tracing::info!(
            spent = self.spent.load(Ordering::Relaxed),
            max = ?self.max_requests,
            "request budget status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_budget_always_has_budget() {
        let budget = RequestBudget::unlimited();
        for _ in 0..1000 {
            assert!(budget.start_request());
        }
        assert!(budget.has_budget());
    }

    #[test]
    fn budget_tracks_spend() {
        let budget = RequestBudget::new(Some(5));
        for _ in 0..3 {
            budget.start_request();
        }
        assert_eq!(budget.spent(), 3);
        assert_eq!(budget.remaining(), Some(2));
    }

    #[test]
    fn budget_exceeded_returns_false() {
        let budget = RequestBudget::new(Some(2));
        assert!(budget.start_request());
        assert!(budget.start_request());
        assert!(!budget.start_request());
        assert!(!budget.has_budget());
    }
}

//! Computes the set of promos to include in a digest since the last
//! successful send: NEW promos created since then, UPDATED
//! promos with a recorded change since then, and ACTIVE promos unchanged
//! but still live, subject to a cooldown so the same unchanged promo
//! doesn't reappear every single day.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use saleradar_common::constants::DEFAULT_DIGEST_LOOKBACK_HOURS;
use saleradar_common::domain::{ChangeType, Promo, PromoStatus, RunType, StoreId};
use saleradar_common::normalize::normalize_headline;
use saleradar_db::{PromoRepo, RunRepo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestBadge {
    New,
    Updated,
    Active,
}

#[derive(Clone, Debug)]
pub struct DigestItem {
    pub promo: Promo,
    pub badge: DigestBadge,
}

pub struct DigestSelector {
    promos: PromoRepo,
    runs: RunRepo,
}

impl DigestSelector {
    pub fn new(promos: PromoRepo, runs: RunRepo) -> Self {
        Self { promos, runs }
    }

    /// Time of the last successfully-sent digest of `run_type`, or
    /// `DEFAULT_DIGEST_LOOKBACK_HOURS` ago if none exists yet.
    pub async fn last_digest_time(&self, run_type: RunType) -> Result<DateTime<Utc>> {
        let last = self.runs.last_successful_digest(run_type).await?;
        Ok(last
            .and_then(|r| r.digest_sent_at)
            .unwrap_or_else(|| Utc::now() - chrono::Duration::hours(DEFAULT_DIGEST_LOOKBACK_HOURS)))
    }

    /// Builds the digest item list for `store_ids`, deduping by normalized
    /// headline within a store (the same offer reworded across two emails
    /// should appear once). The ACTIVE badge (unchanged-but-still-live
    /// promos) is only considered when `include_unchanged` is set, and even
    /// then is subject to the `cooldown_days` notification cooldown so the
    /// same unchanged promo isn't re-sent every run.
    pub async fn select(
        &self,
        store_ids: &[StoreId],
        since: DateTime<Utc>,
        include_unchanged: bool,
        cooldown_days: i64,
    ) -> Result<Vec<DigestItem>> {
        let changes = self.promos.changes_since(since).await?;

        let mut new_promo_ids: HashSet<_> = HashSet::new();
        let mut updated_promo_ids: HashSet<_> = HashSet::new();
        for change in &changes {
            if change.change_type == ChangeType::Created {
                new_promo_ids.insert(change.promo_id);
            } else {
                updated_promo_ids.insert(change.promo_id);
            }
        }
        // A promo that was both created and changed since `since` (e.g. a
        // daily run that also records a same-day discount bump) is NEW,
        // not UPDATED.
        updated_promo_ids.retain(|id| !new_promo_ids.contains(id));

        let active = self.promos.active_promos_for_stores(store_ids).await?;
        let cooldown_cutoff = Utc::now() - chrono::Duration::days(cooldown_days);

        let mut items = Vec::new();
        let mut seen_headlines: HashSet<(StoreId, String)> = HashSet::new();

        for promo in active {
            if !store_ids.contains(&promo.store_id) || promo.status != PromoStatus::Active {
                continue;
            }
            let badge = if new_promo_ids.contains(&promo.id) {
                DigestBadge::New
            } else if updated_promo_ids.contains(&promo.id) {
                DigestBadge::Updated
            } else if include_unchanged
                && promo.last_seen_at >= cooldown_cutoff
                && promo.last_notified_at.map(|t| t < cooldown_cutoff).unwrap_or(true)
            {
                DigestBadge::Active
            } else {
                continue;
            };

            let dedup_key = (promo.store_id, normalize_headline(&promo.headline));
            if !seen_headlines.insert(dedup_key) {
                continue;
            }

            items.push(DigestItem { promo, badge });
        }

        items.sort_by(|a, b| badge_rank(a.badge).cmp(&badge_rank(b.badge)));
        Ok(items)
    }
}

fn badge_rank(badge: DigestBadge) -> u8 {
    match badge {
        DigestBadge::New => 0,
        DigestBadge::Updated => 1,
        DigestBadge::Active => 2,
    }
}

//! Canonical promo merging and change detection. Each
//! extracted promo candidate is matched against an existing promo for the
//! store within a rolling window; if none matches, a new promo is
//! created. Either way the email evidence link is recorded and any
//! detected change is appended to the change log — both idempotently.

use anyhow::Result;
use saleradar_common::constants::{PROMO_MATCH_GRACE_DAYS, PROMO_MATCH_WINDOW_DAYS};
use saleradar_common::domain::{ChangeType, MessageId, Promo, PromoStatus, PromoVertical, StoreId};
use saleradar_common::normalize::compute_base_key;
use saleradar_db::{PromoFields, PromoRepo};
use serde_json::json;

use saleradar_extract::ExtractedPromo;

pub struct PromoMerger {
    repo: PromoRepo,
}

pub struct MergeOutcome {
    pub promo: Promo,
    pub created: bool,
    pub changes_recorded: usize,
}

impl PromoMerger {
    pub fn new(repo: PromoRepo) -> Self {
        Self { repo }
    }

    /// Merges one extracted promo for `store_id`, attributing evidence to
    /// `message_id`. Returns `None` if the candidate carries no base-key
    /// material at all (should not happen once `filter_non_discount_promos`
    /// has run, but the merger re-derives the key independently rather
    /// than trusting the caller).
    pub async fn merge(
        &self,
        store_id: StoreId,
        message_id: MessageId,
        candidate: &ExtractedPromo,
    ) -> Result<MergeOutcome> {
        let base_key = compute_base_key(
            candidate.code.as_deref(),
            candidate.landing_url.as_deref(),
            &candidate.headline,
        );

        let fields = to_promo_fields(candidate);

        let existing = self
            .repo
            .find_matching_promo(store_id, &base_key, PROMO_MATCH_WINDOW_DAYS, PROMO_MATCH_GRACE_DAYS)
            .await?;

        let (promo, created, changes_recorded) = match existing {
            None => {
                let promo = self.repo.create(store_id, &base_key, &fields).await?;
                self.repo
                    .insert_change_if_new(promo.id, Some(message_id), ChangeType::Created, json!({}))
                    .await?;
                (promo, true, 1)
            }
            Some(existing) => {
                let mut changes_recorded = 0;
                changes_recorded += self
                    .record_changes(&existing, &fields, message_id)
                    .await?;
                let status = if fields.ends_at.map(|e| e > chrono::Utc::now()).unwrap_or(true) {
                    PromoStatus::Active
                } else {
                    existing.status
                };
                let updated = self.repo.update_fields(existing.id, &fields, status).await?;
                (updated, false, changes_recorded)
            }
        };

        self.repo.link_email(promo.id, message_id).await?;

        Ok(MergeOutcome {
            promo,
            created,
            changes_recorded,
        })
    }

    /// Compares `fields` against `existing` and records any of: extended
    /// end date (never shortened — an earlier `ends_at` is not a change
    /// worth surfacing), a changed percent-off, a changed amount-off, a
    /// newly added code, or a changed code (case-insensitive). Each is an
    /// independent change row; a single merge can record more than one.
    async fn record_changes(&self, existing: &Promo, fields: &PromoFields, message_id: MessageId) -> Result<usize> {
        let mut count = 0;

        if let Some(new_ends) = fields.ends_at {
            let extends = existing.ends_at.map(|old| new_ends > old).unwrap_or(true);
            if extends {
                let recorded = self
                    .repo
                    .insert_change_if_new(
                        existing.id,
                        Some(message_id),
                        ChangeType::EndExtended,
                        json!({ "old_ends_at": existing.ends_at, "new_ends_at": new_ends }),
                    )
                    .await?;
                if recorded.is_some() {
                    count += 1;
                }
            }
        }

        let percent_changed = fields.percent_off.is_some() && fields.percent_off != existing.percent_off;
        let amount_changed = fields.amount_off.is_some() && fields.amount_off != existing.amount_off;
        if percent_changed || amount_changed {
            let mut diff = serde_json::Map::new();
            if percent_changed {
                diff.insert("old_percent_off".to_string(), json!(existing.percent_off));
                diff.insert("new_percent_off".to_string(), json!(fields.percent_off));
            }
            if amount_changed {
                diff.insert("old_amount_off".to_string(), json!(existing.amount_off));
                diff.insert("new_amount_off".to_string(), json!(fields.amount_off));
            }
            let recorded = self
                .repo
                .insert_change_if_new(existing.id, Some(message_id), ChangeType::DiscountChanged, diff.into())
                .await?;
            if recorded.is_some() {
                count += 1;
            }
        }

        match (&existing.code, &fields.code) {
            (None, Some(new_code)) if !new_code.trim().is_empty() => {
                let recorded = self
                    .repo
                    .insert_change_if_new(
                        existing.id,
                        Some(message_id),
                        ChangeType::CodeAdded,
                        json!({ "code": new_code }),
                    )
                    .await?;
                if recorded.is_some() {
                    count += 1;
                }
            }
            (Some(old_code), Some(new_code)) if !old_code.eq_ignore_ascii_case(new_code) => {
                let recorded = self
                    .repo
                    .insert_change_if_new(
                        existing.id,
                        Some(message_id),
                        ChangeType::CodeChanged,
                        json!({ "old_code": old_code, "new_code": new_code }),
                    )
                    .await?;
                if recorded.is_some() {
                    count += 1;
                }
            }
            _ => {}
        }

        Ok(count)
    }
}

fn to_promo_fields(candidate: &ExtractedPromo) -> PromoFields {
    let vertical = match candidate.vertical.as_str() {
        "flight" => PromoVertical::Flight,
        "retail" => PromoVertical::Retail,
        _ => PromoVertical::Other,
    };
    PromoFields {
        headline: candidate.headline.clone(),
        code: candidate.code.clone(),
        landing_url: candidate.landing_url.clone(),
        percent_off: candidate.percent_off,
        amount_off: candidate.amount_off,
        discount_text: candidate.discount_text.clone(),
        vertical,
        starts_at: candidate.starts_at,
        ends_at: candidate.ends_at,
    }
}

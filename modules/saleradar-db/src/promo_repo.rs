//! Promo + PromoChange + PromoEmailLink persistence. Backs `PromoMerger`
//! and `DigestSelector`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use saleradar_common::domain::{
    ChangeType, MessageId, Promo, PromoChange, PromoChangeId, PromoId, PromoStatus, PromoVertical, StoreId,
};

use crate::pg_enum::{change_type_from_str, change_type_to_str, promo_status_from_str, promo_status_to_str, vertical_from_str, vertical_to_str};

#[derive(sqlx::FromRow)]
struct PromoRow {
    id: PromoId,
    store_id: StoreId,
    base_key: String,
    headline: String,
    code: Option<String>,
    landing_url: Option<String>,
    percent_off: Option<f64>,
    amount_off: Option<f64>,
    discount_text: Option<String>,
    vertical: String,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    status: String,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    last_notified_at: Option<DateTime<Utc>>,
}

impl TryFrom<PromoRow> for Promo {
    type Error = anyhow::Error;

    fn try_from(r: PromoRow) -> Result<Self> {
        Ok(Promo {
            id: r.id,
            store_id: r.store_id,
            base_key: r.base_key,
            headline: r.headline,
            code: r.code,
            landing_url: r.landing_url,
            percent_off: r.percent_off,
            amount_off: r.amount_off,
            discount_text: r.discount_text,
            vertical: vertical_from_str(&r.vertical)?,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            status: promo_status_from_str(&r.status)?,
            first_seen_at: r.first_seen_at,
            last_seen_at: r.last_seen_at,
            last_notified_at: r.last_notified_at,
        })
    }
}

const PROMO_COLUMNS: &str = "id, store_id, base_key, headline, code, landing_url, percent_off, amount_off, \
     discount_text, vertical, starts_at, ends_at, status, first_seen_at, last_seen_at, last_notified_at";

#[derive(sqlx::FromRow)]
struct PromoChangeRow {
    id: PromoChangeId,
    promo_id: PromoId,
    message_id: Option<MessageId>,
    change_type: String,
    diff: serde_json::Value,
    changed_at: DateTime<Utc>,
}

impl TryFrom<PromoChangeRow> for PromoChange {
    type Error = anyhow::Error;

    fn try_from(r: PromoChangeRow) -> Result<Self> {
        Ok(PromoChange {
            id: r.id,
            promo_id: r.promo_id,
            message_id: r.message_id,
            change_type: change_type_from_str(&r.change_type)?,
            diff: r.diff,
            changed_at: r.changed_at,
        })
    }
}

/// Fields accepted when creating or updating a promo. `PromoMerger` builds
/// this from an `Extraction` before calling into the repo.
pub struct PromoFields {
    pub headline: String,
    pub code: Option<String>,
    pub landing_url: Option<String>,
    pub percent_off: Option<f64>,
    pub amount_off: Option<f64>,
    pub discount_text: Option<String>,
    pub vertical: PromoVertical,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PromoRepo {
    pool: PgPool,
}

impl PromoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a candidate match within the merge window: last
    /// seen within the window, or ending within the grace period, or with
    /// no end date at all.
    pub async fn find_matching_promo(
        &self,
        store_id: StoreId,
        base_key: &str,
        window_days: i64,
        grace_days: i64,
    ) -> Result<Option<Promo>> {
        let row = sqlx::query_as::<_, PromoRow>(&format!(
            r#"
            SELECT {PROMO_COLUMNS}
            FROM promos
            WHERE store_id = $1
              AND base_key = $2
              AND (
                  last_seen_at >= now() - ($3 || ' days')::interval
                  OR ends_at >= now() - ($4 || ' days')::interval
                  OR ends_at IS NULL
              )
            ORDER BY last_seen_at DESC
            LIMIT 1
            "#,
        ))
        .bind(store_id)
        .bind(base_key)
        .bind(window_days.to_string())
        .bind(grace_days.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Promo::try_from).transpose()
    }

    pub async fn create(&self, store_id: StoreId, base_key: &str, fields: &PromoFields) -> Result<Promo> {
        let row = sqlx::query_as::<_, PromoRow>(&format!(
            r#"
            INSERT INTO promos
                (store_id, base_key, headline, code, landing_url, percent_off, amount_off,
                 discount_text, vertical, starts_at, ends_at, status, first_seen_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active', now(), now())
            RETURNING {PROMO_COLUMNS}
            "#,
        ))
        .bind(store_id)
        .bind(base_key)
        .bind(&fields.headline)
        .bind(&fields.code)
        .bind(&fields.landing_url)
        .bind(fields.percent_off)
        .bind(fields.amount_off)
        .bind(&fields.discount_text)
        .bind(vertical_to_str(fields.vertical))
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .fetch_one(&self.pool)
        .await?;
        Promo::try_from(row)
    }

    pub async fn update_fields(
        &self,
        promo_id: PromoId,
        fields: &PromoFields,
        status: PromoStatus,
    ) -> Result<Promo> {
        let row = sqlx::query_as::<_, PromoRow>(&format!(
            r#"
            UPDATE promos SET
                headline = $2,
                code = $3,
                landing_url = $4,
                percent_off = $5,
                amount_off = $6,
                discount_text = $7,
                vertical = $8,
                starts_at = $9,
                ends_at = $10,
                status = $11,
                last_seen_at = now()
            WHERE id = $1
            RETURNING {PROMO_COLUMNS}
            "#,
        ))
        .bind(promo_id)
        .bind(&fields.headline)
        .bind(&fields.code)
        .bind(&fields.landing_url)
        .bind(fields.percent_off)
        .bind(fields.amount_off)
        .bind(&fields.discount_text)
        .bind(vertical_to_str(fields.vertical))
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(promo_status_to_str(status))
        .fetch_one(&self.pool)
        .await?;
        Promo::try_from(row)
    }

    pub async fn touch_last_seen(&self, promo_id: PromoId) -> Result<()> {
        sqlx::query("UPDATE promos SET last_seen_at = now() WHERE id = $1")
            .bind(promo_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stamps `last_notified_at` for every promo included in a successfully
    /// delivered digest, so the cooldown window in `DigestSelector` starts
    /// from the moment the subscriber actually saw it, not from `last_seen_at`.
    pub async fn mark_notified(&self, promo_ids: &[PromoId]) -> Result<()> {
        if promo_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE promos SET last_notified_at = now() WHERE id = ANY($1)")
            .bind(promo_ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a change row unless one with the same `(promo_id, message_id,
    /// change_type)` already exists — the merge pipeline's idempotency
    /// guard. The `unique (promo_id, message_id, change_type)` constraint
    /// makes this a single atomic statement rather than a check-then-insert,
    /// so two concurrent merges for the same promo can't both insert.
    pub async fn insert_change_if_new(
        &self,
        promo_id: PromoId,
        message_id: Option<MessageId>,
        change_type: ChangeType,
        diff: serde_json::Value,
    ) -> Result<Option<PromoChange>> {
        let row = sqlx::query_as::<_, PromoChangeRow>(
            r#"
            INSERT INTO promo_changes (promo_id, message_id, change_type, diff)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (promo_id, message_id, change_type) DO NOTHING
            RETURNING id, promo_id, message_id, change_type, diff, changed_at
            "#,
        )
        .bind(promo_id)
        .bind(message_id)
        .bind(change_type_to_str(change_type))
        .bind(diff)
        .fetch_optional(&self.pool)
        .await?;
        row.map(PromoChange::try_from).transpose()
    }

    pub async fn link_email(&self, promo_id: PromoId, message_id: MessageId) -> Result<()> {
        sqlx::query(
            "INSERT INTO promo_email_links (promo_id, message_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(promo_id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn changes_since(&self, since: DateTime<Utc>) -> Result<Vec<PromoChange>> {
        let rows = sqlx::query_as::<_, PromoChangeRow>(
            "SELECT id, promo_id, message_id, change_type, diff, changed_at \
             FROM promo_changes WHERE changed_at > $1 ORDER BY changed_at ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PromoChange::try_from).collect()
    }

    pub async fn find_by_id(&self, promo_id: PromoId) -> Result<Option<Promo>> {
        let row = sqlx::query_as::<_, PromoRow>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promos WHERE id = $1",
        ))
        .bind(promo_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Promo::try_from).transpose()
    }

    pub async fn active_promos_for_stores(&self, store_ids: &[StoreId]) -> Result<Vec<Promo>> {
        let rows = sqlx::query_as::<_, PromoRow>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promos WHERE store_id = ANY($1) AND status = 'active'",
        ))
        .bind(store_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Promo::try_from).collect()
    }
}

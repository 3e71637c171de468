//! Message + Extraction persistence. Backs mailbox ingestion and the
//! `Extractor` component.

use anyhow::Result;
use sqlx::PgPool;

use saleradar_common::domain::{Extraction, ExtractionId, ExtractionStatus, Message, MessageId, RawSignalId, StoreId};

use crate::pg_enum::{extraction_status_from_str, extraction_status_to_str};

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: MessageId,
    store_id: Option<StoreId>,
    raw_signal_id: Option<RawSignalId>,
    source_message_id: String,
    subject: Option<String>,
    body_text: String,
    body_hash: String,
    from_domain: Option<String>,
    top_links: serde_json::Value,
    extraction_status: String,
    extraction_error: Option<String>,
    received_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(r: MessageRow) -> Result<Self> {
        let top_links = serde_json::from_value(r.top_links).unwrap_or_default();
        Ok(Message {
            id: r.id,
            store_id: r.store_id,
            raw_signal_id: r.raw_signal_id,
            source_message_id: r.source_message_id,
            subject: r.subject,
            body_text: r.body_text,
            body_hash: r.body_hash,
            from_domain: r.from_domain,
            top_links,
            extraction_status: extraction_status_from_str(&r.extraction_status)?,
            extraction_error: r.extraction_error,
            received_at: r.received_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExtractionRow {
    id: ExtractionId,
    message_id: MessageId,
    is_promo_email: bool,
    extracted: serde_json::Value,
    model: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ExtractionRow> for Extraction {
    fn from(r: ExtractionRow) -> Self {
        Extraction {
            id: r.id,
            message_id: r.message_id,
            is_promo_email: r.is_promo_email,
            extracted: r.extracted,
            model: r.model,
            created_at: r.created_at,
        }
    }
}

const MESSAGE_COLUMNS: &str = "id, store_id, raw_signal_id, source_message_id, subject, body_text, \
     body_hash, from_domain, top_links, extraction_status, extraction_error, received_at";

#[derive(Clone)]
pub struct MessageRepo {
    pool: PgPool,
}

impl MessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_if_new(
        &self,
        store_id: Option<StoreId>,
        raw_signal_id: Option<RawSignalId>,
        source_message_id: &str,
        subject: Option<&str>,
        body_text: &str,
        body_hash: &str,
        from_domain: Option<&str>,
        top_links: &[String],
    ) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (store_id, raw_signal_id, source_message_id, subject, body_text, body_hash, from_domain, top_links)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_message_id) DO NOTHING
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(store_id)
        .bind(raw_signal_id)
        .bind(source_message_id)
        .bind(subject)
        .bind(body_text)
        .bind(body_hash)
        .bind(from_domain)
        .bind(serde_json::to_value(top_links)?)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Message::try_from).transpose()
    }

    /// Marks, within the still-`pending` set, every message whose
    /// `(store_id, body_hash)` pair was already seen by a more-recently
    /// received message as `skipped_duplicate`. Run once per extraction
    /// pass before `messages_without_extraction` so the extractor never
    /// spends an LLM call on a body it's already about to process.
    pub async fn dedup_pending(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            WITH ranked AS (
                SELECT id,
                       row_number() OVER (
                           PARTITION BY store_id, body_hash
                           ORDER BY received_at DESC, id
                       ) AS rn
                FROM messages
                WHERE extraction_status = 'pending'
            )
            UPDATE messages
            SET extraction_status = 'skipped_duplicate'
            WHERE id IN (SELECT id FROM ranked WHERE rn > 1)
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Pending messages newest-first (so that, within one extraction pass,
    /// older duplicates of something already processed are the ones that
    /// skip), capped at `limit` — the `max_emails_per_run` guard.
    pub async fn messages_without_extraction(&self, limit: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE extraction_status = 'pending'
            ORDER BY received_at DESC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    pub async fn insert_extraction(
        &self,
        message_id: MessageId,
        is_promo_email: bool,
        extracted: serde_json::Value,
        model: &str,
    ) -> Result<Extraction> {
        let row = sqlx::query_as::<_, ExtractionRow>(
            r#"
            INSERT INTO extractions (message_id, is_promo_email, extracted, model)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id) DO UPDATE SET
                is_promo_email = excluded.is_promo_email,
                extracted = excluded.extracted,
                model = excluded.model
            RETURNING id, message_id, is_promo_email, extracted, model, created_at
            "#,
        )
        .bind(message_id)
        .bind(is_promo_email)
        .bind(extracted)
        .bind(model)
        .fetch_one(&self.pool)
        .await?;
        self.set_extraction_status(message_id, ExtractionStatus::Success, None).await?;
        Ok(row.into())
    }

    /// Records a failed extraction attempt so the message is not picked
    /// up again by `messages_without_extraction` on the next run.
    pub async fn mark_extraction_error(&self, message_id: MessageId, error: &str) -> Result<()> {
        self.set_extraction_status(message_id, ExtractionStatus::Error, Some(error)).await
    }

    async fn set_extraction_status(
        &self,
        message_id: MessageId,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE messages SET extraction_status = $2, extraction_error = $3 WHERE id = $1")
            .bind(message_id)
            .bind(extraction_status_to_str(status))
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn pending_promo_extractions(&self, limit: i64) -> Result<Vec<(Extraction, Message)>> {
        let extraction_rows = sqlx::query_as::<_, ExtractionRow>(
            r#"
            SELECT id, message_id, is_promo_email, extracted, model, created_at
            FROM extractions
            WHERE is_promo_email = true
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(extraction_rows.len());
        for row in extraction_rows {
            let message_id = row.message_id;
            let extraction = Extraction::from(row);
            let message_row = sqlx::query_as::<_, MessageRow>(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1",
            ))
            .bind(message_id)
            .fetch_one(&self.pool)
            .await?;
            out.push((extraction, Message::try_from(message_row)?));
        }
        Ok(out)
    }
}

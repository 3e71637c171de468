//! RawSignal + PayloadBlob persistence. Backs `SignalPersister` and
//! `PayloadStore` (fetch crate).

use anyhow::Result;
use sqlx::PgPool;

use saleradar_common::domain::{PayloadBlob, PayloadBlobId, RawSignal, RawSignalId, SourceConfigId, StoreId};

#[derive(sqlx::FromRow)]
struct PayloadBlobRow {
    id: PayloadBlobId,
    content_hash: String,
    content_type: String,
    byte_len: i64,
    inline_body: Option<Vec<u8>>,
    spill_path: Option<String>,
    compressed: bool,
}

impl From<PayloadBlobRow> for PayloadBlob {
    fn from(r: PayloadBlobRow) -> Self {
        PayloadBlob {
            id: r.id,
            content_hash: r.content_hash,
            content_type: r.content_type,
            byte_len: r.byte_len,
            inline_body: r.inline_body,
            spill_path: r.spill_path,
            compressed: r.compressed,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RawSignalRow {
    id: RawSignalId,
    source_config_id: SourceConfigId,
    store_id: StoreId,
    signal_key: String,
    body_hash: String,
    payload_blob_id: PayloadBlobId,
    metadata: serde_json::Value,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: chrono::DateTime<chrono::Utc>,
}

impl From<RawSignalRow> for RawSignal {
    fn from(r: RawSignalRow) -> Self {
        RawSignal {
            id: r.id,
            source_config_id: r.source_config_id,
            store_id: r.store_id,
            signal_key: r.signal_key,
            body_hash: r.body_hash,
            payload_blob_id: r.payload_blob_id,
            metadata: r.metadata,
            etag: r.etag,
            last_modified: r.last_modified,
            fetched_at: r.fetched_at,
        }
    }
}

#[derive(Clone)]
pub struct SignalRepo {
    pool: PgPool,
}

impl SignalRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Content-addressed insert. Returns the existing blob unchanged when
    /// `content_hash` already exists (`PayloadStore` dedups at this level).
    pub async fn find_blob_by_hash(&self, content_hash: &str) -> Result<Option<PayloadBlob>> {
        let row = sqlx::query_as::<_, PayloadBlobRow>(
            "SELECT id, content_hash, content_type, byte_len, inline_body, spill_path, compressed \
             FROM payload_blobs WHERE content_hash = $1",
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PayloadBlob::from))
    }

    pub async fn find_blob_by_id(&self, id: PayloadBlobId) -> Result<Option<PayloadBlob>> {
        let row = sqlx::query_as::<_, PayloadBlobRow>(
            "SELECT id, content_hash, content_type, byte_len, inline_body, spill_path, compressed \
             FROM payload_blobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PayloadBlob::from))
    }

    pub async fn insert_blob(
        &self,
        content_hash: &str,
        content_type: &str,
        byte_len: i64,
        inline_body: Option<&[u8]>,
        spill_path: Option<&str>,
        compressed: bool,
    ) -> Result<PayloadBlob> {
        let row = sqlx::query_as::<_, PayloadBlobRow>(
            r#"
            INSERT INTO payload_blobs (content_hash, content_type, byte_len, inline_body, spill_path, compressed)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (content_hash) DO UPDATE SET content_hash = excluded.content_hash
            RETURNING id, content_hash, content_type, byte_len, inline_body, spill_path, compressed
            "#,
        )
        .bind(content_hash)
        .bind(content_type)
        .bind(byte_len)
        .bind(inline_body)
        .bind(spill_path)
        .bind(compressed)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Returns `None` when a row with the same `(store_id, signal_key,
    /// body_hash)` already exists — this is the content-dedup boundary
    ///
    pub async fn insert_signal_if_new(
        &self,
        source_config_id: SourceConfigId,
        store_id: StoreId,
        signal_key: &str,
        body_hash: &str,
        payload_blob_id: PayloadBlobId,
        metadata: serde_json::Value,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<Option<RawSignal>> {
        let row = sqlx::query_as::<_, RawSignalRow>(
            r#"
            INSERT INTO raw_signals
                (source_config_id, store_id, signal_key, body_hash, payload_blob_id, metadata, etag, last_modified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (store_id, signal_key, body_hash) DO NOTHING
            RETURNING id, source_config_id, store_id, signal_key, body_hash, payload_blob_id,
                      metadata, etag, last_modified, fetched_at
            "#,
        )
        .bind(source_config_id)
        .bind(store_id)
        .bind(signal_key)
        .bind(body_hash)
        .bind(payload_blob_id)
        .bind(metadata)
        .bind(etag)
        .bind(last_modified)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RawSignal::from))
    }

    pub async fn find_by_id(&self, id: RawSignalId) -> Result<Option<RawSignal>> {
        let row = sqlx::query_as::<_, RawSignalRow>(
            r#"
            SELECT id, source_config_id, store_id, signal_key, body_hash, payload_blob_id,
                   metadata, etag, last_modified, fetched_at
            FROM raw_signals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RawSignal::from))
    }

    pub async fn latest_for_key(&self, store_id: StoreId, signal_key: &str) -> Result<Option<RawSignal>> {
        let row = sqlx::query_as::<_, RawSignalRow>(
            r#"
            SELECT id, source_config_id, store_id, signal_key, body_hash, payload_blob_id,
                   metadata, etag, last_modified, fetched_at
            FROM raw_signals
            WHERE store_id = $1 AND signal_key = $2
            ORDER BY fetched_at DESC
            LIMIT 1
            "#,
        )
        .bind(store_id)
        .bind(signal_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RawSignal::from))
    }

    pub async fn pending_signals_without_message(&self, limit: i64) -> Result<Vec<RawSignal>> {
        let rows = sqlx::query_as::<_, RawSignalRow>(
            r#"
            SELECT rs.id, rs.source_config_id, rs.store_id, rs.signal_key, rs.body_hash,
                   rs.payload_blob_id, rs.metadata, rs.etag, rs.last_modified, rs.fetched_at
            FROM raw_signals rs
            LEFT JOIN messages m ON m.raw_signal_id = rs.id
            WHERE m.id IS NULL
            ORDER BY rs.fetched_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RawSignal::from).collect())
    }
}

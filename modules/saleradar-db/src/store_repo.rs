//! Store catalog persistence. Backs `StoreCatalog` (pipeline crate).

use anyhow::Result;
use sqlx::PgPool;

use saleradar_common::domain::{SourceConfig, SourceConfigId, Store, StoreId};

use crate::pg_enum::{source_type_from_str, source_type_to_str};

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    slug: String,
    name: String,
    active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<StoreRow> for Store {
    fn from(r: StoreRow) -> Self {
        Store {
            id: r.id,
            slug: r.slug,
            name: r.name,
            active: r.active,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SourceConfigRow {
    id: SourceConfigId,
    store_id: StoreId,
    source_type: String,
    tier: i32,
    url: Option<String>,
    config: serde_json::Value,
    active: bool,
    last_successful_run: Option<chrono::DateTime<chrono::Utc>>,
    failure_count: i32,
}

impl TryFrom<SourceConfigRow> for SourceConfig {
    type Error = anyhow::Error;

    fn try_from(r: SourceConfigRow) -> Result<Self> {
        Ok(SourceConfig {
            id: r.id,
            store_id: r.store_id,
            source_type: source_type_from_str(&r.source_type)?,
            tier: r.tier,
            url: r.url,
            config: r.config,
            active: r.active,
            last_successful_run: r.last_successful_run,
            failure_count: r.failure_count,
        })
    }
}

#[derive(Clone)]
pub struct StoreRepo {
    pool: PgPool,
}

impl StoreRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_store(&self, slug: &str, name: &str, active: bool) -> Result<Store> {
        let row = sqlx::query_as::<_, StoreRow>(
            r#"
            INSERT INTO stores (slug, name, active)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET name = excluded.name, active = excluded.active
            RETURNING id, slug, name, active, created_at
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn upsert_source(
        &self,
        store_id: StoreId,
        source_type: saleradar_common::domain::SourceType,
        tier: i32,
        url: Option<&str>,
        config: serde_json::Value,
    ) -> Result<SourceConfig> {
        let row = sqlx::query_as::<_, SourceConfigRow>(
            r#"
            INSERT INTO source_configs (store_id, source_type, tier, url, config)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (store_id, source_type, url) DO UPDATE SET
                tier = excluded.tier,
                config = excluded.config,
                active = true
            RETURNING id, store_id, source_type, tier, url, config, active,
                      last_successful_run, failure_count
            "#,
        )
        .bind(store_id)
        .bind(source_type_to_str(source_type))
        .bind(tier)
        .bind(url)
        .bind(config)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    pub async fn active_stores(&self) -> Result<Vec<Store>> {
        let rows = sqlx::query_as::<_, StoreRow>(
            "SELECT id, slug, name, active, created_at FROM stores WHERE active = true ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Store::from).collect())
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, slug, name, active, created_at FROM stores WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Store::from))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Store>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let rows = sqlx::query_as::<_, StoreRow>(
            "SELECT id, slug, name, active, created_at FROM stores \
             WHERE lower(name) LIKE $1 OR lower(slug) LIKE $1 ORDER BY slug",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Store::from).collect())
    }

    pub async fn active_sources_for_store(&self, store_id: StoreId) -> Result<Vec<SourceConfig>> {
        let rows = sqlx::query_as::<_, SourceConfigRow>(
            r#"
            SELECT id, store_id, source_type, tier, url, config, active,
                   last_successful_run, failure_count
            FROM source_configs
            WHERE store_id = $1 AND active = true
            ORDER BY tier ASC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SourceConfig::try_from).collect()
    }

    pub async fn all_active_sources(&self) -> Result<Vec<SourceConfig>> {
        let rows = sqlx::query_as::<_, SourceConfigRow>(
            r#"
            SELECT id, store_id, source_type, tier, url, config, active,
                   last_successful_run, failure_count
            FROM source_configs
            WHERE active = true
            ORDER BY store_id, tier ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SourceConfig::try_from).collect()
    }

    pub async fn mark_success(&self, source_id: SourceConfigId) -> Result<()> {
        sqlx::query(
            "UPDATE source_configs SET last_successful_run = now(), failure_count = 0 WHERE id = $1",
        )
        .bind(source_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failure(&self, source_id: SourceConfigId) -> Result<()> {
        sqlx::query("UPDATE source_configs SET failure_count = failure_count + 1 WHERE id = $1")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

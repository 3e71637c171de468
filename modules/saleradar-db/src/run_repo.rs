//! Run persistence and the advisory-lock single-writer guard.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use saleradar_common::domain::{Run, RunId, RunStatus, RunType};

use crate::pg_enum::{run_status_from_str, run_status_to_str, run_type_from_str, run_type_to_str};

#[derive(sqlx::FromRow)]
struct RunRow {
    id: RunId,
    run_type: String,
    digest_date: NaiveDate,
    status: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    digest_sent_at: Option<DateTime<Utc>>,
    stats: serde_json::Value,
}

impl TryFrom<RunRow> for Run {
    type Error = anyhow::Error;

    fn try_from(r: RunRow) -> Result<Self> {
        Ok(Run {
            id: r.id,
            run_type: run_type_from_str(&r.run_type)?,
            digest_date: r.digest_date,
            status: run_status_from_str(&r.status)?,
            started_at: r.started_at,
            finished_at: r.finished_at,
            digest_sent_at: r.digest_sent_at,
            stats: r.stats,
        })
    }
}

/// Holds a Postgres session-scoped advisory lock for the lifetime of a run.
/// `pg_try_advisory_lock` is reentrant only within the same session, so the
/// guard pins a single connection for the run and releases on drop via a
/// detached task if `release()` was never called explicitly.
pub struct RunLockGuard {
    pool: PgPool,
    key: i64,
    released: bool,
}

impl RunLockGuard {
    pub async fn release(mut self) -> Result<()> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .execute(&self.pool)
            .await?;
        self.released = true;
        Ok(())
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let pool = self.pool.clone();
        let key = self.key;
        tokio::spawn(async move {
            let _ = sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(key)
                .execute(&pool)
                .await;
        });
    }
}

fn lock_key(run_type: RunType) -> i64 {
    match run_type {
        RunType::Daily => 0x5a1e_5d01,
        RunType::Weekly => 0x5a1e_5d02,
    }
}

#[derive(Clone)]
pub struct RunRepo {
    pool: PgPool,
}

impl RunRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attempts to acquire the single-writer lock for `run_type`. Returns
    /// `None` immediately if another process already holds it — callers
    /// must not block waiting — one writer per run type, ever.
    pub async fn try_acquire_lock(&self, run_type: RunType) -> Result<Option<RunLockGuard>> {
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(lock_key(run_type))
            .fetch_one(&self.pool)
            .await?;
        if !acquired {
            return Ok(None);
        }
        Ok(Some(RunLockGuard {
            pool: self.pool.clone(),
            key: lock_key(run_type),
            released: false,
        }))
    }

    /// Creates the run row for `(run_type, digest_date)`, or reuses an
    /// existing one that never sent a digest — a crashed prior attempt
    /// left in `status='failed'` (or a stuck `running` row) is retried
    /// rather than wedged forever. Returns `None` only when a digest for
    /// this day was already sent (`digest_sent_at` set); that row is left
    /// untouched, preserving send-once-per-day.
    pub async fn start(&self, run_type: RunType, digest_date: NaiveDate) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            INSERT INTO runs (run_type, digest_date, status)
            VALUES ($1, $2, 'running')
            ON CONFLICT (run_type, digest_date) DO UPDATE SET
                status = 'running',
                started_at = now(),
                finished_at = NULL
            WHERE runs.digest_sent_at IS NULL
            RETURNING id, run_type, digest_date, status, started_at, finished_at, digest_sent_at, stats
            "#,
        )
        .bind(run_type_to_str(run_type))
        .bind(digest_date)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Run::try_from).transpose()
    }

    pub async fn finish(
        &self,
        run_id: RunId,
        status: RunStatus,
        stats: serde_json::Value,
        digest_sent: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE runs SET
                status = $2,
                finished_at = now(),
                stats = $3,
                digest_sent_at = CASE WHEN $4 THEN now() ELSE digest_sent_at END
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(run_status_to_str(status))
        .bind(stats)
        .bind(digest_sent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn last_successful_digest(&self, run_type: RunType) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, run_type, digest_date, status, started_at, finished_at, digest_sent_at, stats
            FROM runs
            WHERE run_type = $1 AND status = 'success' AND digest_sent_at IS NOT NULL
            ORDER BY digest_sent_at DESC
            LIMIT 1
            "#,
        )
        .bind(run_type_to_str(run_type))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Run::try_from).transpose()
    }

    pub async fn latest(&self, run_type: RunType) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>(
            "SELECT id, run_type, digest_date, status, started_at, finished_at, digest_sent_at, stats \
             FROM runs WHERE run_type = $1 ORDER BY started_at DESC LIMIT 1",
        )
        .bind(run_type_to_str(run_type))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Run::try_from).transpose()
    }
}

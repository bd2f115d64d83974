//! Database operations for `sync_runs` and `sync_run_companies`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pulseboard_engine::{ItemOutcome, RunReport};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub companies_processed: i32,
    pub companies_failed: i32,
    pub companies_skipped: i32,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `sync_run_companies` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct SyncRunCompanyRow {
    pub id: i64,
    pub sync_run_id: i64,
    pub company_id: i64,
    pub status: String,
    pub platforms_synced: i32,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
                           companies_processed, companies_failed, companies_skipped, \
                           duration_ms, error_message, created_at";

// ---------------------------------------------------------------------------
// sync_runs operations
// ---------------------------------------------------------------------------

/// Creates a new sync run in `queued` status and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_sync_run(pool: &PgPool, trigger_source: &str) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO sync_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Marks a run as `succeeded` with its report totals.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`.
pub async fn complete_sync_run(pool: &PgPool, id: i64, report: &RunReport) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET \
             status = 'succeeded', completed_at = NOW(), \
             companies_processed = $1, companies_failed = $2, companies_skipped = $3, \
             duration_ms = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(i32::try_from(report.succeeded).unwrap_or(i32::MAX))
    .bind(i32::try_from(report.failed).unwrap_or(i32::MAX))
    .bind(i32::try_from(report.skipped).unwrap_or(i32::MAX))
    .bind(i64::try_from(report.duration_ms).unwrap_or(i64::MAX))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given id.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM sync_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    Ok(row)
}

/// The most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM sync_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// sync_run_companies operations
// ---------------------------------------------------------------------------

/// Inserts or updates the per-company result row for a run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_sync_run_company(
    pool: &PgPool,
    run_id: i64,
    outcome: &ItemOutcome,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_run_companies \
             (sync_run_id, company_id, status, platforms_synced, error_message, duration_ms) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (sync_run_id, company_id) DO UPDATE SET \
             status = EXCLUDED.status, \
             platforms_synced = EXCLUDED.platforms_synced, \
             error_message = EXCLUDED.error_message, \
             duration_ms = EXCLUDED.duration_ms",
    )
    .bind(run_id)
    .bind(outcome.company_id)
    .bind(outcome.status.as_str())
    .bind(i32::try_from(outcome.platforms_synced.len()).unwrap_or(i32::MAX))
    .bind(outcome.error.as_deref())
    .bind(i64::try_from(outcome.duration_ms).unwrap_or(i64::MAX))
    .execute(pool)
    .await?;
    Ok(())
}

/// All company-level result rows for a run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_run_companies(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<SyncRunCompanyRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunCompanyRow>(
        "SELECT id, sync_run_id, company_id, status, platforms_synced, \
                error_message, duration_ms, created_at \
         FROM sync_run_companies WHERE sync_run_id = $1 ORDER BY company_id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

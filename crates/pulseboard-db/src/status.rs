//! Database operations for the `sync_status` table.
//!
//! One row per (company, platform), created lazily on the first attempt
//! and mutated in place by every attempt thereafter.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use pulseboard_core::{DateRange, Platform};
use pulseboard_engine::{SyncState, SyncStatusRecord};

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    company_id: i64,
    platform: String,
    state: String,
    last_sync_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
    consecutive_failures: i32,
    data_start_date: Option<NaiveDate>,
    data_end_date: Option<NaiveDate>,
}

impl StatusRow {
    fn into_record(self) -> Result<SyncStatusRecord, DbError> {
        let platform: Platform = self.platform.parse().map_err(|e| DbError::Decode {
            context: format!("sync_status.platform for company {}", self.company_id),
            reason: format!("{e}"),
        })?;
        let state: SyncState = self.state.parse().map_err(|reason| DbError::Decode {
            context: format!("sync_status.state for company {}", self.company_id),
            reason,
        })?;
        Ok(SyncStatusRecord {
            company_id: self.company_id,
            platform,
            state,
            last_sync_at: self.last_sync_at,
            last_success_at: self.last_success_at,
            last_error: self.last_error,
            last_error_at: self.last_error_at,
            consecutive_failures: self.consecutive_failures,
            data_start_date: self.data_start_date,
            data_end_date: self.data_end_date,
        })
    }
}

const SELECT_COLUMNS: &str = "company_id, platform, state, last_sync_at, last_success_at, \
                              last_error, last_error_at, consecutive_failures, \
                              data_start_date, data_end_date";

/// Transition to `syncing` at the start of an attempt.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_syncing(
    pool: &PgPool,
    company_id: i64,
    platform: Platform,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_status (company_id, platform, state, last_sync_at) \
         VALUES ($1, $2, 'syncing', $3) \
         ON CONFLICT (company_id, platform) DO UPDATE SET \
             state = 'syncing', last_sync_at = EXCLUDED.last_sync_at",
    )
    .bind(company_id)
    .bind(platform.as_str())
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a successful attempt: reset the failure counter, clear the
/// error, and widen the covered data window to include `range`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_success(
    pool: &PgPool,
    company_id: i64,
    platform: Platform,
    now: DateTime<Utc>,
    range: DateRange,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_status \
             (company_id, platform, state, last_sync_at, last_success_at, \
              consecutive_failures, data_start_date, data_end_date) \
         VALUES ($1, $2, 'success', $3, $3, 0, $4, $5) \
         ON CONFLICT (company_id, platform) DO UPDATE SET \
             state = 'success', \
             last_success_at = EXCLUDED.last_success_at, \
             consecutive_failures = 0, \
             last_error = NULL, \
             data_start_date = LEAST(COALESCE(sync_status.data_start_date, $4), $4), \
             data_end_date = GREATEST(COALESCE(sync_status.data_end_date, $5), $5)",
    )
    .bind(company_id)
    .bind(platform.as_str())
    .bind(now)
    .bind(range.start)
    .bind(range.end)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a failed attempt: stamp the error and bump the failure counter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_failure(
    pool: &PgPool,
    company_id: i64,
    platform: Platform,
    now: DateTime<Utc>,
    error: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_status \
             (company_id, platform, state, last_error, last_error_at, consecutive_failures) \
         VALUES ($1, $2, 'error', $3, $4, 1) \
         ON CONFLICT (company_id, platform) DO UPDATE SET \
             state = 'error', \
             last_error = EXCLUDED.last_error, \
             last_error_at = EXCLUDED.last_error_at, \
             consecutive_failures = sync_status.consecutive_failures + 1",
    )
    .bind(company_id)
    .bind(platform.as_str())
    .bind(error)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Status records, optionally filtered to a set of companies.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored row no longer
/// decodes.
pub async fn list_status(
    pool: &PgPool,
    company_ids: Option<&[i64]>,
) -> Result<Vec<SyncStatusRecord>, DbError> {
    let rows = match company_ids {
        Some(ids) => {
            sqlx::query_as::<_, StatusRow>(&format!(
                "SELECT {SELECT_COLUMNS} FROM sync_status \
                 WHERE company_id = ANY($1) ORDER BY company_id, platform"
            ))
            .bind(ids)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, StatusRow>(&format!(
                "SELECT {SELECT_COLUMNS} FROM sync_status ORDER BY company_id, platform"
            ))
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(StatusRow::into_record).collect()
}

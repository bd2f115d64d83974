//! Database operations for the `metric_cache` table.
//!
//! Entries are keyed by (company, range, kind); writes are atomic upserts
//! so concurrent writers race to last-write-wins, never to a torn entry.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pulseboard_core::DateRange;
use pulseboard_engine::{CacheEntry, CacheKind};

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct CacheRow {
    company_id: i64,
    range_start: chrono::NaiveDate,
    range_end: chrono::NaiveDate,
    kind: String,
    payload: serde_json::Value,
    written_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CacheRow {
    fn into_entry(self) -> Result<CacheEntry, DbError> {
        let kind: CacheKind = self.kind.parse().map_err(|reason| DbError::Decode {
            context: format!("metric_cache.kind for company {}", self.company_id),
            reason,
        })?;
        let range =
            DateRange::new(self.range_start, self.range_end).map_err(|e| DbError::Decode {
                context: format!("metric_cache range for company {}", self.company_id),
                reason: e.to_string(),
            })?;
        Ok(CacheEntry {
            company_id: self.company_id,
            range,
            kind,
            payload: serde_json::from_value(self.payload)?,
            written_at: self.written_at,
            expires_at: self.expires_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "company_id, range_start, range_end, kind, payload, written_at, expires_at";

/// The unexpired entry for an exact key.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored payload no longer
/// decodes.
pub async fn get_entry(
    pool: &PgPool,
    company_id: i64,
    range: DateRange,
    kind: CacheKind,
) -> Result<Option<CacheEntry>, DbError> {
    let row = sqlx::query_as::<_, CacheRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM metric_cache \
         WHERE company_id = $1 AND range_start = $2 AND range_end = $3 AND kind = $4 \
           AND expires_at > NOW()"
    ))
    .bind(company_id)
    .bind(range.start)
    .bind(range.end)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(CacheRow::into_entry).transpose()
}

/// An expired entry for an exact key, no further past expiry than
/// `grace_secs`, most recently written first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored payload no longer
/// decodes.
pub async fn get_stale_entry(
    pool: &PgPool,
    company_id: i64,
    range: DateRange,
    kind: CacheKind,
    grace_secs: i64,
) -> Result<Option<CacheEntry>, DbError> {
    #[allow(clippy::cast_precision_loss)]
    let grace = grace_secs as f64;
    let row = sqlx::query_as::<_, CacheRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM metric_cache \
         WHERE company_id = $1 AND range_start = $2 AND range_end = $3 AND kind = $4 \
           AND expires_at <= NOW() \
           AND expires_at > NOW() - make_interval(secs => $5) \
         ORDER BY written_at DESC LIMIT 1"
    ))
    .bind(company_id)
    .bind(range.start)
    .bind(range.end)
    .bind(kind.as_str())
    .bind(grace)
    .fetch_optional(pool)
    .await?;

    row.map(CacheRow::into_entry).transpose()
}

/// Atomic replace of the entry for its key.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or the upsert fails.
pub async fn put_entry(pool: &PgPool, entry: &CacheEntry) -> Result<(), DbError> {
    let payload = serde_json::to_value(&entry.payload)?;
    sqlx::query(
        "INSERT INTO metric_cache \
             (company_id, range_start, range_end, kind, payload, written_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (company_id, range_start, range_end, kind) DO UPDATE SET \
             payload = EXCLUDED.payload, \
             written_at = EXCLUDED.written_at, \
             expires_at = EXCLUDED.expires_at",
    )
    .bind(entry.company_id)
    .bind(entry.range.start)
    .bind(entry.range.end)
    .bind(entry.kind.as_str())
    .bind(payload)
    .bind(entry.written_at)
    .bind(entry.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete entries written before the cutoff. Returns the deleted count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn sweep_entries(pool: &PgPool, older_than: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM metric_cache WHERE written_at < $1")
        .bind(older_than)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

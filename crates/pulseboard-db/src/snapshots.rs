//! Per-platform breakdown snapshots with closest-prior lookup.

use chrono::NaiveDate;
use sqlx::PgPool;

use pulseboard_core::Platform;
use pulseboard_metrics::SnapshotBreakdowns;

use crate::DbError;

/// Upsert the snapshot for one (company, platform, date).
///
/// # Errors
///
/// Returns [`DbError::Json`] if the breakdowns cannot be serialized, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_snapshot(
    pool: &PgPool,
    company_id: i64,
    platform: Platform,
    snapshot_date: NaiveDate,
    breakdowns: &SnapshotBreakdowns,
) -> Result<(), DbError> {
    let payload = serde_json::to_value(breakdowns)?;
    sqlx::query(
        "INSERT INTO platform_snapshots (company_id, platform, snapshot_date, payload) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (company_id, platform, snapshot_date) DO UPDATE SET \
             payload = EXCLUDED.payload",
    )
    .bind(company_id)
    .bind(platform.as_str())
    .bind(snapshot_date)
    .bind(payload)
    .execute(pool)
    .await?;
    Ok(())
}

/// The snapshot dated `on_or_before`, falling back to the closest prior
/// snapshot when no exact-date one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Json`] if
/// a stored payload no longer deserializes.
pub async fn fetch_snapshot(
    pool: &PgPool,
    company_id: i64,
    platform: Platform,
    on_or_before: NaiveDate,
) -> Result<Option<SnapshotBreakdowns>, DbError> {
    let payload: Option<serde_json::Value> = sqlx::query_scalar(
        "SELECT payload FROM platform_snapshots \
         WHERE company_id = $1 AND platform = $2 AND snapshot_date <= $3 \
         ORDER BY snapshot_date DESC LIMIT 1",
    )
    .bind(company_id)
    .bind(platform.as_str())
    .bind(on_or_before)
    .fetch_optional(pool)
    .await?;

    match payload {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

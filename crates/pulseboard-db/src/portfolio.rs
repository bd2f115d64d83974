//! Database operations for the `portfolio_cache` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use pulseboard_engine::PortfolioBundle;

use crate::DbError;

/// The cached portfolio for one user and calendar day.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored payload no longer
/// decodes.
pub async fn get_portfolio(
    pool: &PgPool,
    user_id: i64,
    cache_date: NaiveDate,
) -> Result<Option<PortfolioBundle>, DbError> {
    let payload: Option<serde_json::Value> = sqlx::query_scalar(
        "SELECT payload FROM portfolio_cache WHERE user_id = $1 AND cache_date = $2",
    )
    .bind(user_id)
    .bind(cache_date)
    .fetch_optional(pool)
    .await?;

    match payload {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Create or overwrite the day's portfolio for a user.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or the upsert fails.
pub async fn put_portfolio(
    pool: &PgPool,
    user_id: i64,
    cache_date: NaiveDate,
    bundle: &PortfolioBundle,
) -> Result<(), DbError> {
    let payload = serde_json::to_value(bundle)?;
    sqlx::query(
        "INSERT INTO portfolio_cache (user_id, cache_date, payload, updated_at) \
         VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (user_id, cache_date) DO UPDATE SET \
             payload = EXCLUDED.payload, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(cache_date)
    .bind(payload)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete portfolio records cached before the cutoff. Returns the count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_portfolios(pool: &PgPool, older_than: NaiveDate) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM portfolio_cache WHERE cache_date < $1")
        .bind(older_than)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

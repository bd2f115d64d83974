//! Normalized daily-row storage, one table per platform schema.
//!
//! Writes are keyed upserts so a re-run for the same range replaces
//! rather than accumulates.

use chrono::NaiveDate;
use sqlx::PgPool;

use pulseboard_core::{DateRange, Platform};
use pulseboard_metrics::{
    GaChannelRow, GaDailyRow, GscDailyRow, LiDailyRow, PlatformRows, YtDailyRow,
};

use crate::DbError;

/// Fetch a platform's daily rows for an inclusive date range.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn fetch_daily_rows(
    pool: &PgPool,
    company_id: i64,
    platform: Platform,
    range: DateRange,
) -> Result<PlatformRows, DbError> {
    match platform {
        Platform::Ga => {
            let daily = sqlx::query_as::<_, (NaiveDate, i64, i64, i64, i64, f64, f64)>(
                "SELECT date, sessions, active_users, new_users, page_views, \
                        avg_session_duration_secs, bounce_rate \
                 FROM ga_daily WHERE company_id = $1 AND date BETWEEN $2 AND $3 \
                 ORDER BY date",
            )
            .bind(company_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(
                |(date, sessions, active_users, new_users, page_views, duration, bounce)| {
                    GaDailyRow {
                        date,
                        sessions,
                        active_users,
                        new_users,
                        page_views,
                        avg_session_duration_secs: duration,
                        bounce_rate: bounce,
                    }
                },
            )
            .collect();

            let channels = sqlx::query_as::<_, (NaiveDate, String, i64)>(
                "SELECT date, channel, sessions \
                 FROM ga_channel_daily WHERE company_id = $1 AND date BETWEEN $2 AND $3 \
                 ORDER BY date, channel",
            )
            .bind(company_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|(date, channel, sessions)| GaChannelRow {
                date,
                channel,
                sessions,
            })
            .collect();

            Ok(PlatformRows::Ga { daily, channels })
        }
        Platform::Gsc => {
            let daily = sqlx::query_as::<_, (NaiveDate, i64, i64, f64, f64)>(
                "SELECT date, clicks, impressions, ctr, position \
                 FROM gsc_daily WHERE company_id = $1 AND date BETWEEN $2 AND $3 \
                 ORDER BY date",
            )
            .bind(company_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|(date, clicks, impressions, ctr, position)| GscDailyRow {
                date,
                clicks,
                impressions,
                ctr,
                position,
            })
            .collect();
            Ok(PlatformRows::Gsc { daily })
        }
        Platform::Yt => {
            let daily = sqlx::query_as::<_, (NaiveDate, i64, f64, i64, i64, f64)>(
                "SELECT date, views, watch_time_minutes, subscribers_gained, \
                        subscribers_lost, avg_view_duration_secs \
                 FROM yt_daily WHERE company_id = $1 AND date BETWEEN $2 AND $3 \
                 ORDER BY date",
            )
            .bind(company_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|(date, views, watch, gained, lost, duration)| YtDailyRow {
                date,
                views,
                watch_time_minutes: watch,
                subscribers_gained: gained,
                subscribers_lost: lost,
                avg_view_duration_secs: duration,
            })
            .collect();
            Ok(PlatformRows::Yt { daily })
        }
        Platform::Li => {
            let daily = sqlx::query_as::<_, (NaiveDate, i64, i64, i64, i64, i64, i64, f64)>(
                "SELECT date, impressions, clicks, reactions, comments, shares, \
                        follower_gain, engagement_rate \
                 FROM li_daily WHERE company_id = $1 AND date BETWEEN $2 AND $3 \
                 ORDER BY date",
            )
            .bind(company_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(
                |(date, impressions, clicks, reactions, comments, shares, followers, rate)| {
                    LiDailyRow {
                        date,
                        impressions,
                        clicks,
                        reactions,
                        comments,
                        shares,
                        follower_gain: followers,
                        engagement_rate: rate,
                    }
                },
            )
            .collect();
            Ok(PlatformRows::Li { daily })
        }
    }
}

/// Upsert a platform's fetched daily rows. Returns the row count written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if an insert fails.
pub async fn upsert_daily_rows(
    pool: &PgPool,
    company_id: i64,
    rows: &PlatformRows,
) -> Result<u64, DbError> {
    let mut written: u64 = 0;
    match rows {
        PlatformRows::Ga { daily, channels } => {
            for row in daily {
                sqlx::query(
                    "INSERT INTO ga_daily \
                         (company_id, date, sessions, active_users, new_users, page_views, \
                          avg_session_duration_secs, bounce_rate) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                     ON CONFLICT (company_id, date) DO UPDATE SET \
                         sessions = EXCLUDED.sessions, \
                         active_users = EXCLUDED.active_users, \
                         new_users = EXCLUDED.new_users, \
                         page_views = EXCLUDED.page_views, \
                         avg_session_duration_secs = EXCLUDED.avg_session_duration_secs, \
                         bounce_rate = EXCLUDED.bounce_rate",
                )
                .bind(company_id)
                .bind(row.date)
                .bind(row.sessions)
                .bind(row.active_users)
                .bind(row.new_users)
                .bind(row.page_views)
                .bind(row.avg_session_duration_secs)
                .bind(row.bounce_rate)
                .execute(pool)
                .await?;
                written += 1;
            }
            for row in channels {
                sqlx::query(
                    "INSERT INTO ga_channel_daily (company_id, date, channel, sessions) \
                     VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (company_id, date, channel) DO UPDATE SET \
                         sessions = EXCLUDED.sessions",
                )
                .bind(company_id)
                .bind(row.date)
                .bind(&row.channel)
                .bind(row.sessions)
                .execute(pool)
                .await?;
                written += 1;
            }
        }
        PlatformRows::Gsc { daily } => {
            for row in daily {
                sqlx::query(
                    "INSERT INTO gsc_daily \
                         (company_id, date, clicks, impressions, ctr, position) \
                     VALUES ($1, $2, $3, $4, $5, $6) \
                     ON CONFLICT (company_id, date) DO UPDATE SET \
                         clicks = EXCLUDED.clicks, \
                         impressions = EXCLUDED.impressions, \
                         ctr = EXCLUDED.ctr, \
                         position = EXCLUDED.position",
                )
                .bind(company_id)
                .bind(row.date)
                .bind(row.clicks)
                .bind(row.impressions)
                .bind(row.ctr)
                .bind(row.position)
                .execute(pool)
                .await?;
                written += 1;
            }
        }
        PlatformRows::Yt { daily } => {
            for row in daily {
                sqlx::query(
                    "INSERT INTO yt_daily \
                         (company_id, date, views, watch_time_minutes, subscribers_gained, \
                          subscribers_lost, avg_view_duration_secs) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     ON CONFLICT (company_id, date) DO UPDATE SET \
                         views = EXCLUDED.views, \
                         watch_time_minutes = EXCLUDED.watch_time_minutes, \
                         subscribers_gained = EXCLUDED.subscribers_gained, \
                         subscribers_lost = EXCLUDED.subscribers_lost, \
                         avg_view_duration_secs = EXCLUDED.avg_view_duration_secs",
                )
                .bind(company_id)
                .bind(row.date)
                .bind(row.views)
                .bind(row.watch_time_minutes)
                .bind(row.subscribers_gained)
                .bind(row.subscribers_lost)
                .bind(row.avg_view_duration_secs)
                .execute(pool)
                .await?;
                written += 1;
            }
        }
        PlatformRows::Li { daily } => {
            for row in daily {
                sqlx::query(
                    "INSERT INTO li_daily \
                         (company_id, date, impressions, clicks, reactions, comments, shares, \
                          follower_gain, engagement_rate) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                     ON CONFLICT (company_id, date) DO UPDATE SET \
                         impressions = EXCLUDED.impressions, \
                         clicks = EXCLUDED.clicks, \
                         reactions = EXCLUDED.reactions, \
                         comments = EXCLUDED.comments, \
                         shares = EXCLUDED.shares, \
                         follower_gain = EXCLUDED.follower_gain, \
                         engagement_rate = EXCLUDED.engagement_rate",
                )
                .bind(company_id)
                .bind(row.date)
                .bind(row.impressions)
                .bind(row.clicks)
                .bind(row.reactions)
                .bind(row.comments)
                .bind(row.shares)
                .bind(row.follower_gain)
                .bind(row.engagement_rate)
                .execute(pool)
                .await?;
                written += 1;
            }
        }
    }
    Ok(written)
}

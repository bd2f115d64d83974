//! Reducers from raw daily rows to period summaries.
//!
//! Counter fields are summed. Rate fields are arithmetic means of per-day
//! values. Compound rates (CTR, engagement rate) are re-derived from the
//! summed numerator and denominator; the averaged per-day ratio is used
//! only when the denominator is absent from the input, because the mean
//! of daily ratios weights low-volume days the same as high-volume days.

use crate::bundle::{
    GaMetrics, GaTotals, GaWeekly, GscMetrics, GscTotals, GscWeekly, LiMetrics, LiTotals,
    LiWeekly, PlatformMetrics, YtMetrics, YtTotals, YtWeekly,
};
use crate::rows::{GaChannelRow, GaDailyRow, GscDailyRow, LiDailyRow, PlatformRows, YtDailyRow};
use crate::series::channel_series;
use crate::snapshot::SnapshotBreakdowns;
use crate::weekly::weekly_buckets;

/// Percentage change from `previous` to `current`.
///
/// Returns `None` when `previous` is zero: "up from nothing" is not a
/// percentage.
#[must_use]
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let denom = count as f64;
    values.sum::<f64>() / denom
}

/// A ratio from summed components, falling back to the mean of per-day
/// ratios when the summed denominator is zero or absent.
fn derived_ratio(
    numerator: i64,
    denominator: i64,
    fallback_daily: impl Iterator<Item = f64>,
    count: usize,
) -> f64 {
    if denominator > 0 {
        #[allow(clippy::cast_precision_loss)]
        return numerator as f64 / denominator as f64;
    }
    mean(fallback_daily, count)
}

// ---------------------------------------------------------------------------
// Per-platform summaries
// ---------------------------------------------------------------------------

fn ga_totals(rows: &[GaDailyRow]) -> GaTotals {
    GaTotals {
        sessions: rows.iter().map(|r| r.sessions).sum(),
        active_users: rows.iter().map(|r| r.active_users).sum(),
        new_users: rows.iter().map(|r| r.new_users).sum(),
        page_views: rows.iter().map(|r| r.page_views).sum(),
        avg_session_duration_secs: mean(
            rows.iter().map(|r| r.avg_session_duration_secs),
            rows.len(),
        ),
        bounce_rate: mean(rows.iter().map(|r| r.bounce_rate), rows.len()),
    }
}

/// Summarize web-analytics rows for a period.
///
/// Returns `None` when `daily` is empty: no rows means no data, which the
/// bundle must keep distinct from a period that totalled zero.
#[must_use]
pub fn summarize_ga(
    daily: &[GaDailyRow],
    channels: &[GaChannelRow],
    previous: &[GaDailyRow],
) -> Option<GaMetrics> {
    if daily.is_empty() {
        return None;
    }
    Some(GaMetrics {
        totals: ga_totals(daily),
        previous_period: (!previous.is_empty()).then(|| ga_totals(previous)),
        weekly: weekly_buckets(daily, |r| r.date, |group| GaWeekly {
            sessions: group.iter().map(|r| r.sessions).sum(),
            page_views: group.iter().map(|r| r.page_views).sum(),
        }),
        channels: channel_series(channels),
        breakdowns: SnapshotBreakdowns::default(),
    })
}

fn gsc_totals(rows: &[GscDailyRow]) -> GscTotals {
    let clicks: i64 = rows.iter().map(|r| r.clicks).sum();
    let impressions: i64 = rows.iter().map(|r| r.impressions).sum();
    GscTotals {
        clicks,
        impressions,
        ctr: derived_ratio(clicks, impressions, rows.iter().map(|r| r.ctr), rows.len()),
        avg_position: mean(rows.iter().map(|r| r.position), rows.len()),
    }
}

/// Summarize search-performance rows for a period.
#[must_use]
pub fn summarize_gsc(daily: &[GscDailyRow], previous: &[GscDailyRow]) -> Option<GscMetrics> {
    if daily.is_empty() {
        return None;
    }
    Some(GscMetrics {
        totals: gsc_totals(daily),
        previous_period: (!previous.is_empty()).then(|| gsc_totals(previous)),
        weekly: weekly_buckets(daily, |r| r.date, |group| GscWeekly {
            clicks: group.iter().map(|r| r.clicks).sum(),
            impressions: group.iter().map(|r| r.impressions).sum(),
        }),
        breakdowns: SnapshotBreakdowns::default(),
    })
}

fn yt_totals(rows: &[YtDailyRow]) -> YtTotals {
    let gained: i64 = rows.iter().map(|r| r.subscribers_gained).sum();
    let lost: i64 = rows.iter().map(|r| r.subscribers_lost).sum();
    YtTotals {
        views: rows.iter().map(|r| r.views).sum(),
        watch_time_minutes: rows.iter().map(|r| r.watch_time_minutes).sum(),
        subscribers_gained: gained,
        subscribers_lost: lost,
        net_subscribers: gained - lost,
        avg_view_duration_secs: mean(rows.iter().map(|r| r.avg_view_duration_secs), rows.len()),
    }
}

/// Summarize video-platform rows for a period.
#[must_use]
pub fn summarize_yt(daily: &[YtDailyRow], previous: &[YtDailyRow]) -> Option<YtMetrics> {
    if daily.is_empty() {
        return None;
    }
    Some(YtMetrics {
        totals: yt_totals(daily),
        previous_period: (!previous.is_empty()).then(|| yt_totals(previous)),
        weekly: weekly_buckets(daily, |r| r.date, |group| YtWeekly {
            views: group.iter().map(|r| r.views).sum(),
            watch_time_minutes: group.iter().map(|r| r.watch_time_minutes).sum(),
        }),
        breakdowns: SnapshotBreakdowns::default(),
    })
}

fn li_totals(rows: &[LiDailyRow]) -> LiTotals {
    let impressions: i64 = rows.iter().map(|r| r.impressions).sum();
    let clicks: i64 = rows.iter().map(|r| r.clicks).sum();
    let reactions: i64 = rows.iter().map(|r| r.reactions).sum();
    let comments: i64 = rows.iter().map(|r| r.comments).sum();
    let shares: i64 = rows.iter().map(|r| r.shares).sum();
    let engagements = clicks + reactions + comments + shares;
    LiTotals {
        impressions,
        clicks,
        reactions,
        comments,
        shares,
        engagements,
        follower_gain: rows.iter().map(|r| r.follower_gain).sum(),
        engagement_rate: derived_ratio(
            engagements,
            impressions,
            rows.iter().map(|r| r.engagement_rate),
            rows.len(),
        ),
    }
}

/// Summarize professional-network rows for a period.
#[must_use]
pub fn summarize_li(daily: &[LiDailyRow], previous: &[LiDailyRow]) -> Option<LiMetrics> {
    if daily.is_empty() {
        return None;
    }
    Some(LiMetrics {
        totals: li_totals(daily),
        previous_period: (!previous.is_empty()).then(|| li_totals(previous)),
        weekly: weekly_buckets(daily, |r| r.date, |group| LiWeekly {
            impressions: group.iter().map(|r| r.impressions).sum(),
            engagements: group
                .iter()
                .map(|r| r.clicks + r.reactions + r.comments + r.shares)
                .sum(),
        }),
        breakdowns: SnapshotBreakdowns::default(),
    })
}

/// Summarize any platform's rows, dispatching on the row variant.
///
/// `previous` rows of a different platform than `current` are ignored.
#[must_use]
pub fn summarize(current: &PlatformRows, previous: &PlatformRows) -> Option<PlatformMetrics> {
    match current {
        PlatformRows::Ga { daily, channels } => {
            let prev = match previous {
                PlatformRows::Ga { daily, .. } => daily.as_slice(),
                _ => &[],
            };
            summarize_ga(daily, channels, prev).map(PlatformMetrics::Ga)
        }
        PlatformRows::Gsc { daily } => {
            let prev = match previous {
                PlatformRows::Gsc { daily } => daily.as_slice(),
                _ => &[],
            };
            summarize_gsc(daily, prev).map(PlatformMetrics::Gsc)
        }
        PlatformRows::Yt { daily } => {
            let prev = match previous {
                PlatformRows::Yt { daily } => daily.as_slice(),
                _ => &[],
            };
            summarize_yt(daily, prev).map(PlatformMetrics::Yt)
        }
        PlatformRows::Li { daily } => {
            let prev = match previous {
                PlatformRows::Li { daily } => daily.as_slice(),
                _ => &[],
            };
            summarize_li(daily, prev).map(PlatformMetrics::Li)
        }
    }
}

//! Raw per-day rows as fetched from providers and stored in normalized
//! tables.
//!
//! Numeric fields carry `#[serde(default)]` so a provider payload that
//! omits a field deserializes to zero instead of failing; aggregation
//! must stay total over malformed input.

use chrono::NaiveDate;
use pulseboard_core::Platform;
use serde::{Deserialize, Serialize};

/// One day of web-analytics traffic for a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaDailyRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub sessions: i64,
    #[serde(default)]
    pub active_users: i64,
    #[serde(default)]
    pub new_users: i64,
    #[serde(default)]
    pub page_views: i64,
    #[serde(default)]
    pub avg_session_duration_secs: f64,
    /// Fraction of single-interaction sessions, `0.0..=1.0`.
    #[serde(default)]
    pub bounce_rate: f64,
}

/// One day of web-analytics sessions attributed to a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaChannelRow {
    pub date: NaiveDate,
    pub channel: String,
    #[serde(default)]
    pub sessions: i64,
}

/// One day of search performance for a company's site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GscDailyRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub impressions: i64,
    /// Per-day click-through rate as reported by the provider. Only used
    /// as a fallback when impressions are absent; period CTR is re-derived
    /// from summed clicks/impressions.
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

/// One day of video-platform performance for a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtDailyRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub watch_time_minutes: f64,
    #[serde(default)]
    pub subscribers_gained: i64,
    #[serde(default)]
    pub subscribers_lost: i64,
    #[serde(default)]
    pub avg_view_duration_secs: f64,
}

/// One day of professional-network page performance for an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiDailyRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub reactions: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub follower_gain: i64,
    /// Provider-reported per-day engagement rate; fallback only.
    #[serde(default)]
    pub engagement_rate: f64,
}

/// Daily rows for one platform, tagged by schema.
///
/// The resolver and orchestrator pass rows around without caring which
/// platform produced them; the aggregator dispatches on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformRows {
    Ga {
        daily: Vec<GaDailyRow>,
        #[serde(default)]
        channels: Vec<GaChannelRow>,
    },
    Gsc { daily: Vec<GscDailyRow> },
    Yt { daily: Vec<YtDailyRow> },
    Li { daily: Vec<LiDailyRow> },
}

impl PlatformRows {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            PlatformRows::Ga { .. } => Platform::Ga,
            PlatformRows::Gsc { .. } => Platform::Gsc,
            PlatformRows::Yt { .. } => Platform::Yt,
            PlatformRows::Li { .. } => Platform::Li,
        }
    }

    /// An empty row set for the given platform.
    #[must_use]
    pub fn empty(platform: Platform) -> Self {
        match platform {
            Platform::Ga => PlatformRows::Ga {
                daily: Vec::new(),
                channels: Vec::new(),
            },
            Platform::Gsc => PlatformRows::Gsc { daily: Vec::new() },
            Platform::Yt => PlatformRows::Yt { daily: Vec::new() },
            Platform::Li => PlatformRows::Li { daily: Vec::new() },
        }
    }

    /// `true` if there are no daily rows (channel rows alone do not count
    /// as data).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            PlatformRows::Ga { daily, .. } => daily.is_empty(),
            PlatformRows::Gsc { daily } => daily.is_empty(),
            PlatformRows::Yt { daily } => daily.is_empty(),
            PlatformRows::Li { daily } => daily.is_empty(),
        }
    }

    #[must_use]
    pub fn daily_count(&self) -> usize {
        match self {
            PlatformRows::Ga { daily, .. } => daily.len(),
            PlatformRows::Gsc { daily } => daily.len(),
            PlatformRows::Yt { daily } => daily.len(),
            PlatformRows::Li { daily } => daily.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_numeric_fields_deserialize_to_zero() {
        let row: GscDailyRow =
            serde_json::from_str(r#"{"date":"2025-01-05","clicks":12}"#).expect("parse");
        assert_eq!(row.clicks, 12);
        assert_eq!(row.impressions, 0);
        assert!((row.ctr - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn platform_rows_tag_round_trips() {
        let rows = PlatformRows::Yt {
            daily: vec![YtDailyRow {
                date: chrono::NaiveDate::from_ymd_opt(2025, 1, 5).expect("date"),
                views: 100,
                watch_time_minutes: 40.0,
                subscribers_gained: 2,
                subscribers_lost: 1,
                avg_view_duration_secs: 95.0,
            }],
        };
        let json = serde_json::to_string(&rows).expect("serialize");
        assert!(json.contains("\"platform\":\"yt\""));
        let back: PlatformRows = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.platform(), Platform::Yt);
        assert_eq!(back.daily_count(), 1);
    }

    #[test]
    fn empty_rows_report_empty() {
        for platform in Platform::ALL {
            assert!(PlatformRows::empty(platform).is_empty());
        }
    }
}

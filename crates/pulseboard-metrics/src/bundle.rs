//! Assembled metric shapes: per-platform totals, weekly series, and the
//! per-company [`MetricBundle`] served to dashboards and stored in the
//! point cache.

use std::collections::BTreeMap;

use pulseboard_core::{DateRange, Platform};
use serde::{Deserialize, Serialize};

use crate::series::ChannelSeries;
use crate::snapshot::SnapshotBreakdowns;
use crate::weekly::WeeklyBucket;

// ---------------------------------------------------------------------------
// Period totals per platform
// ---------------------------------------------------------------------------

/// Web-analytics totals for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaTotals {
    pub sessions: i64,
    pub active_users: i64,
    pub new_users: i64,
    pub page_views: i64,
    pub avg_session_duration_secs: f64,
    pub bounce_rate: f64,
}

/// Search-performance totals for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GscTotals {
    pub clicks: i64,
    pub impressions: i64,
    /// Period CTR derived from summed clicks over summed impressions,
    /// not the mean of per-day CTRs.
    pub ctr: f64,
    pub avg_position: f64,
}

/// Video-platform totals for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtTotals {
    pub views: i64,
    pub watch_time_minutes: f64,
    pub subscribers_gained: i64,
    pub subscribers_lost: i64,
    pub net_subscribers: i64,
    pub avg_view_duration_secs: f64,
}

/// Professional-network totals for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiTotals {
    pub impressions: i64,
    pub clicks: i64,
    pub reactions: i64,
    pub comments: i64,
    pub shares: i64,
    /// Clicks + reactions + comments + shares.
    pub engagements: i64,
    pub follower_gain: i64,
    /// Derived from summed engagements over summed impressions.
    pub engagement_rate: f64,
}

// ---------------------------------------------------------------------------
// Weekly sums per platform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaWeekly {
    pub sessions: i64,
    pub page_views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GscWeekly {
    pub clicks: i64,
    pub impressions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtWeekly {
    pub views: i64,
    pub watch_time_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiWeekly {
    pub impressions: i64,
    pub engagements: i64,
}

// ---------------------------------------------------------------------------
// Per-platform metric objects
// ---------------------------------------------------------------------------

/// Web-analytics metrics: totals, optional previous period, weekly series,
/// channel breakdown, and snapshot breakdowns.
///
/// `previous_period` is `None` when no prior-period rows existed, which
/// is not the same as a zeroed previous period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaMetrics {
    pub totals: GaTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<GaTotals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekly: Vec<WeeklyBucket<GaWeekly>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelSeries>,
    #[serde(default, skip_serializing_if = "SnapshotBreakdowns::is_empty")]
    pub breakdowns: SnapshotBreakdowns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GscMetrics {
    pub totals: GscTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<GscTotals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekly: Vec<WeeklyBucket<GscWeekly>>,
    #[serde(default, skip_serializing_if = "SnapshotBreakdowns::is_empty")]
    pub breakdowns: SnapshotBreakdowns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtMetrics {
    pub totals: YtTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<YtTotals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekly: Vec<WeeklyBucket<YtWeekly>>,
    #[serde(default, skip_serializing_if = "SnapshotBreakdowns::is_empty")]
    pub breakdowns: SnapshotBreakdowns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiMetrics {
    pub totals: LiTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<LiTotals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekly: Vec<WeeklyBucket<LiWeekly>>,
    #[serde(default, skip_serializing_if = "SnapshotBreakdowns::is_empty")]
    pub breakdowns: SnapshotBreakdowns,
}

/// A platform metrics object tagged by platform, for code that handles
/// all four schemas uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformMetrics {
    Ga(GaMetrics),
    Gsc(GscMetrics),
    Yt(YtMetrics),
    Li(LiMetrics),
}

impl PlatformMetrics {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            PlatformMetrics::Ga(_) => Platform::Ga,
            PlatformMetrics::Gsc(_) => Platform::Gsc,
            PlatformMetrics::Yt(_) => Platform::Yt,
            PlatformMetrics::Li(_) => Platform::Li,
        }
    }

    /// Attach snapshot breakdowns to whichever variant this is.
    pub fn set_breakdowns(&mut self, breakdowns: SnapshotBreakdowns) {
        match self {
            PlatformMetrics::Ga(m) => m.breakdowns = breakdowns,
            PlatformMetrics::Gsc(m) => m.breakdowns = breakdowns,
            PlatformMetrics::Yt(m) => m.breakdowns = breakdowns,
            PlatformMetrics::Li(m) => m.breakdowns = breakdowns,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricBundle
// ---------------------------------------------------------------------------

/// The assembled result for one company over one date range.
///
/// A platform with no data anywhere is `None`, never a zeroed totals
/// object. Per-platform fetch errors are preserved in `errors` so a
/// partially failed refresh still yields a usable bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub company_id: i64,
    pub range: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ga: Option<GaMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gsc: Option<GscMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yt: Option<YtMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub li: Option<LiMetrics>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<Platform, String>,
}

impl MetricBundle {
    #[must_use]
    pub fn empty(company_id: i64, range: DateRange) -> Self {
        Self {
            company_id,
            range,
            ga: None,
            gsc: None,
            yt: None,
            li: None,
            errors: BTreeMap::new(),
        }
    }

    /// `true` if the bundle carries data for `platform`.
    #[must_use]
    pub fn has_platform(&self, platform: Platform) -> bool {
        match platform {
            Platform::Ga => self.ga.is_some(),
            Platform::Gsc => self.gsc.is_some(),
            Platform::Yt => self.yt.is_some(),
            Platform::Li => self.li.is_some(),
        }
    }

    /// Platforms (out of all four) with no data in this bundle.
    #[must_use]
    pub fn missing_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| !self.has_platform(*p))
            .collect()
    }

    /// `true` if no platform has any data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing_platforms().len() == Platform::ALL.len()
    }

    /// Install a platform metrics object into its slot.
    pub fn set(&mut self, metrics: PlatformMetrics) {
        match metrics {
            PlatformMetrics::Ga(m) => self.ga = Some(m),
            PlatformMetrics::Gsc(m) => self.gsc = Some(m),
            PlatformMetrics::Yt(m) => self.yt = Some(m),
            PlatformMetrics::Li(m) => self.li = Some(m),
        }
    }

    /// Borrow a platform's metrics, if present.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<PlatformMetrics> {
        match platform {
            Platform::Ga => self.ga.clone().map(PlatformMetrics::Ga),
            Platform::Gsc => self.gsc.clone().map(PlatformMetrics::Gsc),
            Platform::Yt => self.yt.clone().map(PlatformMetrics::Yt),
            Platform::Li => self.li.clone().map(PlatformMetrics::Li),
        }
    }

    /// Copy `platform`'s section (if present) from `other` into `self`.
    ///
    /// Used by the resolver to fill gaps from a cached bundle without
    /// overwriting platforms already resolved from a cheaper tier.
    pub fn adopt_platform(&mut self, other: &MetricBundle, platform: Platform) -> bool {
        if self.has_platform(platform) {
            return false;
        }
        match other.get(platform) {
            Some(metrics) => {
                self.set(metrics);
                true
            }
            None => false,
        }
    }

    /// Record a per-platform fetch error without discarding the bundle.
    pub fn record_error(&mut self, platform: Platform, message: impl Into<String>) {
        self.errors.insert(platform, message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"),
            NaiveDate::from_ymd_opt(2025, 1, 30).expect("date"),
        )
        .expect("range")
    }

    fn gsc_metrics() -> GscMetrics {
        GscMetrics {
            totals: GscTotals {
                clicks: 40,
                impressions: 300,
                ctr: 40.0 / 300.0,
                avg_position: 12.5,
            },
            previous_period: None,
            weekly: Vec::new(),
            breakdowns: SnapshotBreakdowns::default(),
        }
    }

    #[test]
    fn empty_bundle_reports_all_platforms_missing() {
        let bundle = MetricBundle::empty(1, range());
        assert!(bundle.is_empty());
        assert_eq!(bundle.missing_platforms().len(), 4);
    }

    #[test]
    fn set_fills_the_matching_slot() {
        let mut bundle = MetricBundle::empty(1, range());
        bundle.set(PlatformMetrics::Gsc(gsc_metrics()));
        assert!(bundle.has_platform(Platform::Gsc));
        assert!(!bundle.has_platform(Platform::Ga));
        assert_eq!(bundle.missing_platforms().len(), 3);
    }

    #[test]
    fn adopt_platform_does_not_overwrite_existing_data() {
        let mut bundle = MetricBundle::empty(1, range());
        bundle.set(PlatformMetrics::Gsc(gsc_metrics()));

        let mut other = MetricBundle::empty(1, range());
        let mut stale = gsc_metrics();
        stale.totals.clicks = 999;
        other.set(PlatformMetrics::Gsc(stale));

        assert!(!bundle.adopt_platform(&other, Platform::Gsc));
        assert_eq!(bundle.gsc.as_ref().map(|m| m.totals.clicks), Some(40));
    }

    #[test]
    fn absent_platforms_are_omitted_from_json_not_zeroed() {
        let mut bundle = MetricBundle::empty(7, range());
        bundle.set(PlatformMetrics::Gsc(gsc_metrics()));
        let json = serde_json::to_string(&bundle).expect("serialize");
        assert!(json.contains("\"gsc\""));
        assert!(!json.contains("\"ga\""));
        assert!(!json.contains("\"yt\""));
    }

    #[test]
    fn recorded_errors_survive_serialization() {
        let mut bundle = MetricBundle::empty(7, range());
        bundle.record_error(Platform::Yt, "fetch timed out after 15s");
        let json = serde_json::to_string(&bundle).expect("serialize");
        let back: MetricBundle = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(
            back.errors.get(&Platform::Yt).map(String::as_str),
            Some("fetch timed out after 15s")
        );
    }
}

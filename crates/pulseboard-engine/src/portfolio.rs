//! User-level portfolio assembly: per-company bundles plus cross-company
//! totals, cached once per calendar day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pulseboard_core::DateRange;
use pulseboard_metrics::MetricBundle;

/// Cross-company rollup of the headline volume metrics.
///
/// Only companies that resolved with data contribute;
/// `companies_with_data` keeps "three companies totalling zero" distinct
/// from "zero companies resolved".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioTotals {
    pub companies_with_data: usize,
    pub sessions: i64,
    pub page_views: i64,
    pub search_clicks: i64,
    pub search_impressions: i64,
    pub video_views: i64,
    pub social_impressions: i64,
    pub social_engagements: i64,
}

impl PortfolioTotals {
    /// Sum headline metrics across resolved company bundles.
    #[must_use]
    pub fn from_bundles(bundles: &[MetricBundle]) -> Self {
        let mut totals = Self::default();
        for bundle in bundles {
            if bundle.is_empty() {
                continue;
            }
            totals.companies_with_data += 1;
            if let Some(ga) = &bundle.ga {
                totals.sessions += ga.totals.sessions;
                totals.page_views += ga.totals.page_views;
            }
            if let Some(gsc) = &bundle.gsc {
                totals.search_clicks += gsc.totals.clicks;
                totals.search_impressions += gsc.totals.impressions;
            }
            if let Some(yt) = &bundle.yt {
                totals.video_views += yt.totals.views;
            }
            if let Some(li) = &bundle.li {
                totals.social_impressions += li.totals.impressions;
                totals.social_engagements += li.totals.engagements;
            }
        }
        totals
    }
}

/// A user's assembled portfolio for one date range on one calendar day.
///
/// References the companies' bundles by value at assembly time; the
/// underlying cache entries stay owned per-company and shared across
/// users with access to the same company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBundle {
    pub user_id: i64,
    pub range: DateRange,
    pub cache_date: NaiveDate,
    pub companies: Vec<MetricBundle>,
    pub aggregate: PortfolioTotals,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulseboard_metrics::{GscMetrics, GscTotals, PlatformMetrics, SnapshotBreakdowns};

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 30).unwrap(),
        )
        .unwrap()
    }

    fn bundle_with_clicks(company_id: i64, clicks: i64) -> MetricBundle {
        let mut bundle = MetricBundle::empty(company_id, range());
        bundle.set(PlatformMetrics::Gsc(GscMetrics {
            totals: GscTotals {
                clicks,
                impressions: clicks * 10,
                ctr: 0.1,
                avg_position: 5.0,
            },
            previous_period: None,
            weekly: Vec::new(),
            breakdowns: SnapshotBreakdowns::default(),
        }));
        bundle
    }

    #[test]
    fn totals_sum_across_companies() {
        let bundles = vec![bundle_with_clicks(1, 10), bundle_with_clicks(2, 30)];
        let totals = PortfolioTotals::from_bundles(&bundles);
        assert_eq!(totals.companies_with_data, 2);
        assert_eq!(totals.search_clicks, 40);
        assert_eq!(totals.search_impressions, 400);
        assert_eq!(totals.sessions, 0);
    }

    #[test]
    fn empty_bundles_do_not_count_as_having_data() {
        let bundles = vec![bundle_with_clicks(1, 10), MetricBundle::empty(2, range())];
        let totals = PortfolioTotals::from_bundles(&bundles);
        assert_eq!(totals.companies_with_data, 1);
    }
}

//! Non-time-series breakdowns attached to a bundle: top-N lists and
//! demographic segments, refreshed less frequently than daily rows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStat {
    pub path: String,
    #[serde(default)]
    pub page_views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStat {
    pub query: String,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub impressions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStat {
    pub title: String,
    #[serde(default)]
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentShare {
    pub segment: String,
    /// Fraction of the audience, `0.0..=1.0`.
    #[serde(default)]
    pub share: f64,
}

/// A platform's precomputed breakdowns for a period.
///
/// Sections a platform does not produce stay empty: top pages come from
/// web analytics, top queries from search, top videos and demographics
/// from the video platform, demographics alone from the professional
/// network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotBreakdowns {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_pages: Vec<PageStat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_queries: Vec<QueryStat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_videos: Vec<VideoStat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub demographics: Vec<SegmentShare>,
}

impl SnapshotBreakdowns {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top_pages.is_empty()
            && self.top_queries.is_empty()
            && self.top_videos.is_empty()
            && self.demographics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sections_are_omitted_from_json() {
        let breakdowns = SnapshotBreakdowns {
            top_queries: vec![QueryStat {
                query: "oat milk".to_string(),
                clicks: 40,
                impressions: 300,
            }],
            ..SnapshotBreakdowns::default()
        };
        let json = serde_json::to_string(&breakdowns).expect("serialize");
        assert!(json.contains("top_queries"));
        assert!(!json.contains("top_pages"));
        assert!(!json.contains("demographics"));
    }

    #[test]
    fn default_is_empty() {
        assert!(SnapshotBreakdowns::default().is_empty());
    }
}

//! Channel time-series builder for the web-analytics breakdown.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::rows::GaChannelRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: i64,
}

/// One channel's daily session counts over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub channel: String,
    pub points: Vec<SeriesPoint>,
}

/// Build per-channel daily series from raw channel rows.
///
/// Every channel seen anywhere in the input gets a point for every date
/// seen anywhere in the input, zero-filled where that channel had no row
/// that day. Duplicate rows for the same (date, channel) are summed.
#[must_use]
pub fn channel_series(rows: &[GaChannelRow]) -> Vec<ChannelSeries> {
    let dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();

    let mut by_channel: BTreeMap<&str, BTreeMap<NaiveDate, i64>> = BTreeMap::new();
    for row in rows {
        *by_channel
            .entry(row.channel.as_str())
            .or_default()
            .entry(row.date)
            .or_insert(0) += row.sessions;
    }

    by_channel
        .into_iter()
        .map(|(channel, values)| ChannelSeries {
            channel: channel.to_string(),
            points: dates
                .iter()
                .map(|date| SeriesPoint {
                    date: *date,
                    value: values.get(date).copied().unwrap_or(0),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).expect("valid date")
    }

    fn row(day: u32, channel: &str, sessions: i64) -> GaChannelRow {
        GaChannelRow {
            date: d(day),
            channel: channel.to_string(),
            sessions,
        }
    }

    #[test]
    fn zero_fills_missing_channel_days() {
        let rows = vec![
            row(1, "organic", 10),
            row(2, "organic", 12),
            row(1, "paid", 5),
            // paid has no row on day 2
        ];
        let series = channel_series(&rows);

        assert_eq!(series.len(), 2);
        let paid = series.iter().find(|s| s.channel == "paid").expect("paid");
        assert_eq!(paid.points.len(), 2);
        assert_eq!(paid.points[1].date, d(2));
        assert_eq!(paid.points[1].value, 0);
    }

    #[test]
    fn duplicate_rows_for_same_day_are_summed() {
        let rows = vec![row(1, "organic", 10), row(1, "organic", 3)];
        let series = channel_series(&rows);
        assert_eq!(series[0].points[0].value, 13);
    }

    #[test]
    fn empty_input_produces_no_series() {
        assert!(channel_series(&[]).is_empty());
    }

    #[test]
    fn points_are_date_ordered() {
        let rows = vec![row(5, "organic", 1), row(2, "organic", 2)];
        let series = channel_series(&rows);
        assert_eq!(series[0].points[0].date, d(2));
        assert_eq!(series[0].points[1].date, d(5));
    }
}

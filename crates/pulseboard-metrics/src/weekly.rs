//! ISO-week bucketing for dashboard time series.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One week's worth of rows reduced to a platform-specific total `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket<T> {
    /// Display label, `{startMonth startDay}-{endDay}`, e.g. `Jan 6-12`.
    pub label: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub totals: T,
}

/// The Monday starting the ISO week that contains `date`.
#[must_use]
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Groups `rows` into ISO weeks (Monday start) and folds each group.
///
/// Buckets are ordered by week. A bucket's start/end are the first and
/// last row dates actually present in that week, so partial weeks at the
/// edges of a range label only the days they cover.
pub fn weekly_buckets<R, T>(
    rows: &[R],
    date_of: impl Fn(&R) -> NaiveDate,
    fold: impl Fn(&[&R]) -> T,
) -> Vec<WeeklyBucket<T>> {
    let mut by_week: Vec<(NaiveDate, Vec<&R>)> = Vec::new();

    let mut sorted: Vec<&R> = rows.iter().collect();
    sorted.sort_by_key(|r| date_of(r));

    for row in sorted {
        let monday = week_monday(date_of(row));
        match by_week.last_mut() {
            Some((week, group)) if *week == monday => group.push(row),
            _ => by_week.push((monday, vec![row])),
        }
    }

    by_week
        .into_iter()
        .map(|(_, group)| {
            let start = date_of(group[0]);
            let end = date_of(group[group.len() - 1]);
            WeeklyBucket {
                label: week_label(start, end),
                week_start: start,
                week_end: end,
                totals: fold(&group),
            }
        })
        .collect()
}

fn week_label(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} {}-{}", month_abbrev(start), start.day(), end.day())
}

fn month_abbrev(date: NaiveDate) -> &'static str {
    match date.month() {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn week_monday_rolls_back_to_monday() {
        // 2025-01-08 is a Wednesday; its week starts Monday 2025-01-06.
        assert_eq!(week_monday(d(2025, 1, 8)), d(2025, 1, 6));
        assert_eq!(week_monday(d(2025, 1, 6)), d(2025, 1, 6));
        assert_eq!(week_monday(d(2025, 1, 12)), d(2025, 1, 6));
    }

    #[test]
    fn buckets_split_on_iso_week_boundaries() {
        // Jan 6 2025 is a Monday. Ten consecutive days span two ISO weeks.
        let rows: Vec<NaiveDate> = (0..10).map(|i| d(2025, 1, 6) + Duration::days(i)).collect();
        let buckets = weekly_buckets(&rows, |r| *r, |group| group.len());

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].totals, 7);
        assert_eq!(buckets[0].label, "Jan 6-12");
        assert_eq!(buckets[1].totals, 3);
        assert_eq!(buckets[1].label, "Jan 13-15");
    }

    #[test]
    fn partial_leading_week_labels_covered_days_only() {
        // Jan 9 2025 is a Thursday; the first bucket covers Thu-Sun.
        let rows: Vec<NaiveDate> = (0..6).map(|i| d(2025, 1, 9) + Duration::days(i)).collect();
        let buckets = weekly_buckets(&rows, |r| *r, |group| group.len());

        assert_eq!(buckets[0].label, "Jan 9-12");
        assert_eq!(buckets[0].totals, 4);
        assert_eq!(buckets[1].week_start, d(2025, 1, 13));
    }

    #[test]
    fn unsorted_input_is_bucketed_identically() {
        let mut rows: Vec<NaiveDate> = (0..10).map(|i| d(2025, 1, 6) + Duration::days(i)).collect();
        rows.reverse();
        let buckets = weekly_buckets(&rows, |r| *r, |group| group.len());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].week_start, d(2025, 1, 6));
    }

    #[test]
    fn empty_rows_produce_no_buckets() {
        let buckets = weekly_buckets(&[] as &[NaiveDate], |r| *r, |group| group.len());
        assert!(buckets.is_empty());
    }
}

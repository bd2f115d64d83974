//! Inclusive calendar date ranges used for metric queries and cache keys.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// An inclusive range of calendar days.
///
/// Ranges are the unit of cache keying: two requests for the same company
/// and the same `DateRange` resolve to the same cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRange`] if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of days covered, inclusive of both endpoints.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The equivalent-length range immediately preceding this one.
    ///
    /// A 30-day range ending Jan 30 mirrors to the 30-day range ending
    /// Dec 31. Used for period-over-period comparison.
    #[must_use]
    pub fn previous_period(&self) -> DateRange {
        let len = self.days();
        let end = self.start - Duration::days(1);
        DateRange {
            start: end - Duration::days(len - 1),
            end,
        }
    }

    /// The trailing `days`-day range ending at `end` (inclusive).
    #[must_use]
    pub fn trailing_days(end: NaiveDate, days: u32) -> DateRange {
        DateRange {
            start: end - Duration::days(i64::from(days) - 1),
            end,
        }
    }

    /// `true` if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

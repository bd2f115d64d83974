//! Storage seams the engine resolves and syncs through.
//!
//! Every store is an `async_trait` object so the resolver and
//! orchestrator can be exercised against in-memory fakes; the database
//! crate provides the Postgres implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pulseboard_core::{CachePolicy, DateRange, Platform};
use pulseboard_metrics::{MetricBundle, PlatformRows, SnapshotBreakdowns};

use crate::error::StoreResult;
use crate::portfolio::PortfolioBundle;
use crate::report::ItemOutcome;
use crate::report::RunReport;
use crate::status::SyncStatusRecord;

// ---------------------------------------------------------------------------
// Cache entries
// ---------------------------------------------------------------------------

/// Which cache a bundle entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Exact-range bundle with the standard (48h) expiry.
    Point,
    /// Longer-lived (7-day) bundle serving as the secondary fallback
    /// tier; refreshed by the same writes, consulted after the point
    /// cache misses.
    Snapshot,
}

impl CacheKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Point => "point",
            CacheKind::Snapshot => "snapshot",
        }
    }
}

impl std::str::FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(CacheKind::Point),
            "snapshot" => Ok(CacheKind::Snapshot),
            other => Err(format!("unknown cache kind: {other}")),
        }
    }
}

/// Freshness of a cache entry relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Young enough to serve as-is.
    Fresh,
    /// Still servable, but serving it should trigger a background refresh.
    Stale,
    /// Past hard expiry; the fresh tier must not return it.
    Expired,
}

/// A previously assembled bundle with an explicit lifecycle.
///
/// Entries are superseded by the next write for the same
/// (company, range, kind) key, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub company_id: i64,
    pub range: DateRange,
    pub kind: CacheKind,
    pub payload: MetricBundle,
    pub written_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Classify this entry's freshness.
    ///
    /// Age below the staleness threshold is fresh; between the threshold
    /// and the entry's own expiry is stale; past expiry is expired.
    #[must_use]
    pub fn freshness(&self, now: DateTime<Utc>, policy: &CachePolicy) -> Freshness {
        if now >= self.expires_at {
            return Freshness::Expired;
        }
        if now - self.written_at >= policy.staleness {
            return Freshness::Stale;
        }
        Freshness::Fresh
    }
}

/// The point cache: previously assembled bundles keyed by
/// (company, range, kind).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The entry for the exact key, if present and not yet expired.
    async fn get(
        &self,
        company_id: i64,
        range: DateRange,
        kind: CacheKind,
    ) -> StoreResult<Option<CacheEntry>>;

    /// An expired entry for the exact key, no further past its expiry
    /// than `grace`, preferring the most recently written.
    async fn get_stale(
        &self,
        company_id: i64,
        range: DateRange,
        kind: CacheKind,
        grace: Duration,
    ) -> StoreResult<Option<CacheEntry>>;

    /// Atomic last-write-wins upsert for the entry's key.
    async fn put(&self, entry: CacheEntry) -> StoreResult<()>;

    /// Delete entries written before `older_than`; returns the count.
    async fn sweep(&self, older_than: DateTime<Utc>) -> StoreResult<u64>;
}

// ---------------------------------------------------------------------------
// Normalized storage
// ---------------------------------------------------------------------------

/// Durable per-day metric rows and per-period snapshots.
#[async_trait]
pub trait NormalizedStore: Send + Sync {
    /// All daily rows for one platform over a range.
    async fn daily_rows(
        &self,
        company_id: i64,
        platform: Platform,
        range: DateRange,
    ) -> StoreResult<PlatformRows>;

    /// The snapshot dated `on_or_before`, falling back to the closest
    /// prior snapshot when no exact-date one exists.
    async fn snapshot(
        &self,
        company_id: i64,
        platform: Platform,
        on_or_before: NaiveDate,
    ) -> StoreResult<Option<SnapshotBreakdowns>>;

    /// Upsert fetched daily rows; returns the number of rows written.
    async fn upsert_daily_rows(&self, company_id: i64, rows: &PlatformRows) -> StoreResult<u64>;

    /// Upsert a snapshot for the given date.
    async fn upsert_snapshot(
        &self,
        company_id: i64,
        platform: Platform,
        snapshot_date: NaiveDate,
        breakdowns: &SnapshotBreakdowns,
    ) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Companies, users, status, portfolio, runs
// ---------------------------------------------------------------------------

/// A company's mapping onto one provider platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub platform: Platform,
    pub account_ref: String,
}

/// Who exists and what they are mapped to.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// All active company ids.
    async fn company_ids(&self) -> StoreResult<Vec<i64>>;

    /// The platform mappings configured for one company.
    async fn mappings(&self, company_id: i64) -> StoreResult<Vec<Mapping>>;

    /// The companies a user's portfolio spans.
    async fn companies_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>>;
}

/// Per-(company, platform) sync health records.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Transition to `syncing` at the start of an attempt, creating the
    /// record if this is the first attempt ever.
    async fn mark_syncing(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Record a successful attempt covering `range`.
    async fn mark_success(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
        range: DateRange,
    ) -> StoreResult<()>;

    /// Record a failed attempt with its error message.
    async fn mark_failure(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
        error: &str,
    ) -> StoreResult<()>;

    /// Status records, optionally filtered to a set of companies.
    async fn list(&self, company_ids: Option<&[i64]>) -> StoreResult<Vec<SyncStatusRecord>>;
}

/// Per-(user, day) portfolio cache.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn get(
        &self,
        user_id: i64,
        cache_date: NaiveDate,
    ) -> StoreResult<Option<PortfolioBundle>>;

    async fn put(
        &self,
        user_id: i64,
        cache_date: NaiveDate,
        bundle: &PortfolioBundle,
    ) -> StoreResult<()>;

    /// Delete records cached before `older_than`; returns the count.
    async fn prune(&self, older_than: NaiveDate) -> StoreResult<u64>;
}

/// Persistence for orchestrator runs, for operational visibility.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create a run in `queued` status; returns its id.
    async fn create_run(&self, trigger: &str) -> StoreResult<i64>;

    /// Transition the run to `running`.
    async fn start_run(&self, run_id: i64) -> StoreResult<()>;

    /// Record one company's outcome within the run.
    async fn record_item(&self, run_id: i64, outcome: &ItemOutcome) -> StoreResult<()>;

    /// Transition the run to `succeeded` with its final report.
    async fn complete_run(&self, run_id: i64, report: &RunReport) -> StoreResult<()>;

    /// Transition the run to `failed`.
    async fn fail_run(&self, run_id: i64, error: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(written_secs_ago: i64, expires_in_secs: i64) -> CacheEntry {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 30).unwrap(),
        )
        .unwrap();
        CacheEntry {
            company_id: 1,
            range,
            kind: CacheKind::Point,
            payload: MetricBundle::empty(1, range),
            written_at: now - Duration::seconds(written_secs_ago),
            expires_at: now + Duration::seconds(expires_in_secs),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn entry_one_second_inside_staleness_threshold_is_fresh() {
        // Written 12h - 1s ago with 48h expiry.
        let e = entry(12 * 3600 - 1, 36 * 3600 + 1);
        assert_eq!(e.freshness(now(), &CachePolicy::default()), Freshness::Fresh);
    }

    #[test]
    fn entry_one_second_past_staleness_threshold_is_stale() {
        let e = entry(12 * 3600 + 1, 36 * 3600 - 1);
        assert_eq!(e.freshness(now(), &CachePolicy::default()), Freshness::Stale);
    }

    #[test]
    fn entry_past_its_expiry_is_expired() {
        // Written 48h + 1s ago, expired 1s ago.
        let e = entry(48 * 3600 + 1, -1);
        assert_eq!(
            e.freshness(now(), &CachePolicy::default()),
            Freshness::Expired
        );
    }

    #[test]
    fn entry_exactly_at_expiry_is_expired() {
        let e = entry(48 * 3600, 0);
        assert_eq!(
            e.freshness(now(), &CachePolicy::default()),
            Freshness::Expired
        );
    }
}

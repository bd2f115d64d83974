//! Postgres implementations of the engine's store traits.
//!
//! Each adapter is a thin wrapper over a [`PgPool`] delegating to the
//! query modules and folding [`crate::DbError`] into the engine's opaque
//! [`StoreError`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use pulseboard_core::{DateRange, Platform};
use pulseboard_engine::{
    CacheEntry, CacheKind, CacheStore, CompanyDirectory, ItemOutcome, Mapping, NormalizedStore,
    PortfolioBundle, PortfolioStore, RunReport, RunStore, StatusStore, StoreError, StoreResult,
    SyncStatusRecord,
};
use pulseboard_metrics::{PlatformRows, SnapshotBreakdowns};

#[derive(Clone)]
pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(
        &self,
        company_id: i64,
        range: DateRange,
        kind: CacheKind,
    ) -> StoreResult<Option<CacheEntry>> {
        crate::cache::get_entry(&self.pool, company_id, range, kind)
            .await
            .map_err(StoreError::new)
    }

    async fn get_stale(
        &self,
        company_id: i64,
        range: DateRange,
        kind: CacheKind,
        grace: Duration,
    ) -> StoreResult<Option<CacheEntry>> {
        crate::cache::get_stale_entry(&self.pool, company_id, range, kind, grace.num_seconds())
            .await
            .map_err(StoreError::new)
    }

    async fn put(&self, entry: CacheEntry) -> StoreResult<()> {
        crate::cache::put_entry(&self.pool, &entry)
            .await
            .map_err(StoreError::new)
    }

    async fn sweep(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        crate::cache::sweep_entries(&self.pool, older_than)
            .await
            .map_err(StoreError::new)
    }
}

#[derive(Clone)]
pub struct PgNormalizedStore {
    pool: PgPool,
}

impl PgNormalizedStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NormalizedStore for PgNormalizedStore {
    async fn daily_rows(
        &self,
        company_id: i64,
        platform: Platform,
        range: DateRange,
    ) -> StoreResult<PlatformRows> {
        crate::daily::fetch_daily_rows(&self.pool, company_id, platform, range)
            .await
            .map_err(StoreError::new)
    }

    async fn snapshot(
        &self,
        company_id: i64,
        platform: Platform,
        on_or_before: NaiveDate,
    ) -> StoreResult<Option<SnapshotBreakdowns>> {
        crate::snapshots::fetch_snapshot(&self.pool, company_id, platform, on_or_before)
            .await
            .map_err(StoreError::new)
    }

    async fn upsert_daily_rows(&self, company_id: i64, rows: &PlatformRows) -> StoreResult<u64> {
        crate::daily::upsert_daily_rows(&self.pool, company_id, rows)
            .await
            .map_err(StoreError::new)
    }

    async fn upsert_snapshot(
        &self,
        company_id: i64,
        platform: Platform,
        snapshot_date: NaiveDate,
        breakdowns: &SnapshotBreakdowns,
    ) -> StoreResult<()> {
        crate::snapshots::upsert_snapshot(&self.pool, company_id, platform, snapshot_date, breakdowns)
            .await
            .map_err(StoreError::new)
    }
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyDirectory for PgDirectory {
    async fn company_ids(&self) -> StoreResult<Vec<i64>> {
        crate::companies::list_company_ids(&self.pool)
            .await
            .map_err(StoreError::new)
    }

    async fn mappings(&self, company_id: i64) -> StoreResult<Vec<Mapping>> {
        crate::companies::list_mappings(&self.pool, company_id)
            .await
            .map_err(StoreError::new)
    }

    async fn companies_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        crate::companies::companies_for_user(&self.pool, user_id)
            .await
            .map_err(StoreError::new)
    }
}

#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn mark_syncing(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        crate::status::mark_syncing(&self.pool, company_id, platform, now)
            .await
            .map_err(StoreError::new)
    }

    async fn mark_success(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
        range: DateRange,
    ) -> StoreResult<()> {
        crate::status::mark_success(&self.pool, company_id, platform, now, range)
            .await
            .map_err(StoreError::new)
    }

    async fn mark_failure(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
        error: &str,
    ) -> StoreResult<()> {
        crate::status::mark_failure(&self.pool, company_id, platform, now, error)
            .await
            .map_err(StoreError::new)
    }

    async fn list(&self, company_ids: Option<&[i64]>) -> StoreResult<Vec<SyncStatusRecord>> {
        crate::status::list_status(&self.pool, company_ids)
            .await
            .map_err(StoreError::new)
    }
}

#[derive(Clone)]
pub struct PgPortfolioStore {
    pool: PgPool,
}

impl PgPortfolioStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortfolioStore for PgPortfolioStore {
    async fn get(
        &self,
        user_id: i64,
        cache_date: NaiveDate,
    ) -> StoreResult<Option<PortfolioBundle>> {
        crate::portfolio::get_portfolio(&self.pool, user_id, cache_date)
            .await
            .map_err(StoreError::new)
    }

    async fn put(
        &self,
        user_id: i64,
        cache_date: NaiveDate,
        bundle: &PortfolioBundle,
    ) -> StoreResult<()> {
        crate::portfolio::put_portfolio(&self.pool, user_id, cache_date, bundle)
            .await
            .map_err(StoreError::new)
    }

    async fn prune(&self, older_than: NaiveDate) -> StoreResult<u64> {
        crate::portfolio::prune_portfolios(&self.pool, older_than)
            .await
            .map_err(StoreError::new)
    }
}

#[derive(Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create_run(&self, trigger: &str) -> StoreResult<i64> {
        crate::runs::create_sync_run(&self.pool, trigger)
            .await
            .map_err(StoreError::new)
    }

    async fn start_run(&self, run_id: i64) -> StoreResult<()> {
        crate::runs::start_sync_run(&self.pool, run_id)
            .await
            .map_err(StoreError::new)
    }

    async fn record_item(&self, run_id: i64, outcome: &ItemOutcome) -> StoreResult<()> {
        crate::runs::upsert_sync_run_company(&self.pool, run_id, outcome)
            .await
            .map_err(StoreError::new)
    }

    async fn complete_run(&self, run_id: i64, report: &RunReport) -> StoreResult<()> {
        crate::runs::complete_sync_run(&self.pool, run_id, report)
            .await
            .map_err(StoreError::new)
    }

    async fn fail_run(&self, run_id: i64, error: &str) -> StoreResult<()> {
        crate::runs::fail_sync_run(&self.pool, run_id, error)
            .await
            .map_err(StoreError::new)
    }
}

//! In-memory store and provider fakes for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use pulseboard_core::{DateRange, Platform};
use pulseboard_metrics::{GscDailyRow, PlatformRows, SnapshotBreakdowns};
use pulseboard_providers::{FetchedMetrics, ProviderClient, ProviderError};

use crate::error::StoreResult;
use crate::portfolio::PortfolioBundle;
use crate::report::ItemOutcome;
use crate::report::RunReport;
use crate::status::{SyncState, SyncStatusRecord};
use crate::store::{
    CacheEntry, CacheKind, CacheStore, CompanyDirectory, Mapping, NormalizedStore, PortfolioStore,
    RunStore, StatusStore,
};

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MemoryCache {
    pub entries: Mutex<HashMap<(i64, DateRange, CacheKind), CacheEntry>>,
    pub get_calls: AtomicU32,
    pub put_calls: AtomicU32,
}

impl MemoryCache {
    pub(crate) fn seed(&self, entry: CacheEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert((entry.company_id, entry.range, entry.kind), entry);
    }

    pub(crate) fn gets(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn puts(&self) -> u32 {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(
        &self,
        company_id: i64,
        range: DateRange,
        kind: CacheKind,
    ) -> StoreResult<Option<CacheEntry>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(company_id, range, kind))
            .filter(|e| e.expires_at > now)
            .cloned())
    }

    async fn get_stale(
        &self,
        company_id: i64,
        range: DateRange,
        kind: CacheKind,
        grace: Duration,
    ) -> StoreResult<Option<CacheEntry>> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(company_id, range, kind))
            .filter(|e| e.expires_at <= now && e.expires_at > now - grace)
            .cloned())
    }

    async fn put(&self, entry: CacheEntry) -> StoreResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.seed(entry);
        Ok(())
    }

    async fn sweep(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.written_at >= older_than);
        Ok((before - entries.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Normalized storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MemoryNormalized {
    pub rows: Mutex<HashMap<(i64, Platform, DateRange), PlatformRows>>,
    pub snapshots: Mutex<HashMap<(i64, Platform), SnapshotBreakdowns>>,
    pub daily_calls: AtomicU32,
    pub upserted: Mutex<Vec<(i64, PlatformRows)>>,
}

impl MemoryNormalized {
    pub(crate) fn seed_rows(&self, company_id: i64, range: DateRange, rows: PlatformRows) {
        self.rows
            .lock()
            .unwrap()
            .insert((company_id, rows.platform(), range), rows);
    }

    pub(crate) fn daily_reads(&self) -> u32 {
        self.daily_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NormalizedStore for MemoryNormalized {
    async fn daily_rows(
        &self,
        company_id: i64,
        platform: Platform,
        range: DateRange,
    ) -> StoreResult<PlatformRows> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(company_id, platform, range))
            .cloned()
            .unwrap_or_else(|| PlatformRows::empty(platform)))
    }

    async fn snapshot(
        &self,
        company_id: i64,
        platform: Platform,
        _on_or_before: NaiveDate,
    ) -> StoreResult<Option<SnapshotBreakdowns>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .get(&(company_id, platform))
            .cloned())
    }

    async fn upsert_daily_rows(&self, company_id: i64, rows: &PlatformRows) -> StoreResult<u64> {
        let count = rows.daily_count() as u64;
        self.upserted.lock().unwrap().push((company_id, rows.clone()));
        Ok(count)
    }

    async fn upsert_snapshot(
        &self,
        company_id: i64,
        platform: Platform,
        _snapshot_date: NaiveDate,
        breakdowns: &SnapshotBreakdowns,
    ) -> StoreResult<()> {
        self.snapshots
            .lock()
            .unwrap()
            .insert((company_id, platform), breakdowns.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory, status, portfolio, runs
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MemoryDirectory {
    pub companies: Vec<i64>,
    pub mappings: HashMap<i64, Vec<Mapping>>,
    pub users: HashMap<i64, Vec<i64>>,
}

impl MemoryDirectory {
    pub(crate) fn with_mapping(mut self, company_id: i64, platform: Platform, account: &str) -> Self {
        if !self.companies.contains(&company_id) {
            self.companies.push(company_id);
        }
        self.mappings.entry(company_id).or_default().push(Mapping {
            platform,
            account_ref: account.to_string(),
        });
        self
    }

    pub(crate) fn with_unmapped_company(mut self, company_id: i64) -> Self {
        self.companies.push(company_id);
        self
    }

    pub(crate) fn with_user(mut self, user_id: i64, companies: &[i64]) -> Self {
        self.users.insert(user_id, companies.to_vec());
        self
    }
}

#[async_trait]
impl CompanyDirectory for MemoryDirectory {
    async fn company_ids(&self) -> StoreResult<Vec<i64>> {
        Ok(self.companies.clone())
    }

    async fn mappings(&self, company_id: i64) -> StoreResult<Vec<Mapping>> {
        Ok(self.mappings.get(&company_id).cloned().unwrap_or_default())
    }

    async fn companies_for_user(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        Ok(self.users.get(&user_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct MemoryStatus {
    pub records: Mutex<HashMap<(i64, Platform), SyncStatusRecord>>,
}

impl MemoryStatus {
    pub(crate) fn record(&self, company_id: i64, platform: Platform) -> Option<SyncStatusRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(company_id, platform))
            .cloned()
    }

    fn entry_mut(
        records: &mut HashMap<(i64, Platform), SyncStatusRecord>,
        company_id: i64,
        platform: Platform,
    ) -> &mut SyncStatusRecord {
        records
            .entry((company_id, platform))
            .or_insert_with(|| SyncStatusRecord {
                company_id,
                platform,
                state: SyncState::Idle,
                last_sync_at: None,
                last_success_at: None,
                last_error: None,
                last_error_at: None,
                consecutive_failures: 0,
                data_start_date: None,
                data_end_date: None,
            })
    }
}

#[async_trait]
impl StatusStore for MemoryStatus {
    async fn mark_syncing(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = Self::entry_mut(&mut records, company_id, platform);
        record.state = SyncState::Syncing;
        record.last_sync_at = Some(now);
        Ok(())
    }

    async fn mark_success(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
        range: DateRange,
    ) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = Self::entry_mut(&mut records, company_id, platform);
        record.state = SyncState::Success;
        record.last_success_at = Some(now);
        record.consecutive_failures = 0;
        record.last_error = None;
        record.data_start_date = Some(
            record
                .data_start_date
                .map_or(range.start, |d| d.min(range.start)),
        );
        record.data_end_date = Some(record.data_end_date.map_or(range.end, |d| d.max(range.end)));
        Ok(())
    }

    async fn mark_failure(
        &self,
        company_id: i64,
        platform: Platform,
        now: DateTime<Utc>,
        error: &str,
    ) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = Self::entry_mut(&mut records, company_id, platform);
        record.state = SyncState::Error;
        record.last_error = Some(error.to_string());
        record.last_error_at = Some(now);
        record.consecutive_failures += 1;
        Ok(())
    }

    async fn list(&self, company_ids: Option<&[i64]>) -> StoreResult<Vec<SyncStatusRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| company_ids.is_none_or(|ids| ids.contains(&r.company_id)))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct MemoryPortfolio {
    pub map: Mutex<HashMap<(i64, NaiveDate), PortfolioBundle>>,
    pub put_calls: AtomicU32,
}

#[async_trait]
impl PortfolioStore for MemoryPortfolio {
    async fn get(
        &self,
        user_id: i64,
        cache_date: NaiveDate,
    ) -> StoreResult<Option<PortfolioBundle>> {
        Ok(self.map.lock().unwrap().get(&(user_id, cache_date)).cloned())
    }

    async fn put(
        &self,
        user_id: i64,
        cache_date: NaiveDate,
        bundle: &PortfolioBundle,
    ) -> StoreResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.map
            .lock()
            .unwrap()
            .insert((user_id, cache_date), bundle.clone());
        Ok(())
    }

    async fn prune(&self, older_than: NaiveDate) -> StoreResult<u64> {
        let mut map = self.map.lock().unwrap();
        let before = map.len();
        map.retain(|(_, date), _| *date >= older_than);
        Ok((before - map.len()) as u64)
    }
}

#[derive(Default)]
pub(crate) struct MemoryRuns {
    pub created: AtomicU32,
    pub completed: AtomicU32,
    pub failed: AtomicU32,
    pub items: Mutex<Vec<ItemOutcome>>,
}

#[async_trait]
impl RunStore for MemoryRuns {
    async fn create_run(&self, _trigger: &str) -> StoreResult<i64> {
        let id = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(i64::from(id))
    }

    async fn start_run(&self, _run_id: i64) -> StoreResult<()> {
        Ok(())
    }

    async fn record_item(&self, _run_id: i64, outcome: &ItemOutcome) -> StoreResult<()> {
        self.items.lock().unwrap().push(outcome.clone());
        Ok(())
    }

    async fn complete_run(&self, _run_id: i64, _report: &RunReport) -> StoreResult<()> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fail_run(&self, _run_id: i64, _error: &str) -> StoreResult<()> {
        self.failed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scripted providers
// ---------------------------------------------------------------------------

pub(crate) enum ProviderMode {
    /// Return these rows.
    Rows(PlatformRows, PlatformRows),
    /// Return an empty payload (provider reachable, no data).
    Empty,
    /// Fail with an API error.
    Fail(String),
    /// Sleep, then return rows. For timeout and concurrency tests.
    SlowRows(std::time::Duration, PlatformRows),
}

pub(crate) struct ScriptedProvider {
    platform: Platform,
    mode: ProviderMode,
    pub calls: AtomicU32,
}

impl ScriptedProvider {
    pub(crate) fn new(platform: Platform, mode: ProviderMode) -> Self {
        Self {
            platform,
            mode,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_metrics(
        &self,
        _account_ref: &str,
        _range: DateRange,
        _previous: DateRange,
    ) -> Result<FetchedMetrics, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            ProviderMode::Rows(current, previous) => Ok(FetchedMetrics {
                platform: self.platform,
                current: current.clone(),
                previous: previous.clone(),
                breakdowns: SnapshotBreakdowns::default(),
            }),
            ProviderMode::Empty => Ok(FetchedMetrics {
                platform: self.platform,
                current: PlatformRows::empty(self.platform),
                previous: PlatformRows::empty(self.platform),
                breakdowns: SnapshotBreakdowns::default(),
            }),
            ProviderMode::Fail(message) => Err(ProviderError::ApiError(message.clone())),
            ProviderMode::SlowRows(delay, current) => {
                tokio::time::sleep(*delay).await;
                Ok(FetchedMetrics {
                    platform: self.platform,
                    current: current.clone(),
                    previous: PlatformRows::empty(self.platform),
                    breakdowns: SnapshotBreakdowns::default(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

pub(crate) fn test_range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 30).unwrap(),
    )
    .unwrap()
}

pub(crate) fn gsc_rows(range: DateRange, clicks_per_day: i64) -> PlatformRows {
    let mut daily = Vec::new();
    let mut date = range.start;
    while date <= range.end {
        daily.push(GscDailyRow {
            date,
            clicks: clicks_per_day,
            impressions: clicks_per_day * 10,
            ctr: 0.1,
            position: 8.0,
        });
        date += Duration::days(1);
    }
    PlatformRows::Gsc { daily }
}

pub(crate) fn cache_entry(
    company_id: i64,
    range: DateRange,
    kind: CacheKind,
    payload: pulseboard_metrics::MetricBundle,
    age: Duration,
    ttl_from_write: Duration,
) -> CacheEntry {
    let written_at = Utc::now() - age;
    CacheEntry {
        company_id,
        range,
        kind,
        payload,
        written_at,
        expires_at: written_at + ttl_from_write,
    }
}

pub(crate) fn bundle_from_gsc(company_id: i64, range: DateRange, clicks_per_day: i64) -> pulseboard_metrics::MetricBundle {
    let rows = gsc_rows(range, clicks_per_day);
    let mut bundle = pulseboard_metrics::MetricBundle::empty(company_id, range);
    if let Some(metrics) = pulseboard_metrics::summarize(&rows, &PlatformRows::empty(Platform::Gsc))
    {
        bundle.set(metrics);
    }
    bundle
}

//! Batch synchronization: refresh cached data for many companies without
//! overwhelming the providers or the host process.
//!
//! Batches run sequentially; companies within a batch run concurrently;
//! the orchestrator sleeps between batches. Neither a company's failure
//! nor one platform's failure within a company aborts the run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;

use pulseboard_core::{BatchPolicy, CachePolicy, DateRange, Platform};
use pulseboard_metrics::{summarize, MetricBundle};
use pulseboard_providers::ProviderRegistry;

use crate::error::EngineError;
use crate::report::{BatchTiming, ItemOutcome, ItemStatus, RunReport};
use crate::store::{
    CacheEntry, CacheKind, CacheStore, CompanyDirectory, Mapping, NormalizedStore, RunStore,
    StatusStore,
};

/// Which companies a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    All,
    /// Targeted refresh, e.g. after a mapping change.
    Companies(Vec<i64>),
}

pub struct SyncOrchestrator {
    normalized: Arc<dyn NormalizedStore>,
    cache: Arc<dyn CacheStore>,
    status: Arc<dyn StatusStore>,
    runs: Arc<dyn RunStore>,
    directory: Arc<dyn CompanyDirectory>,
    providers: ProviderRegistry,
    batch: BatchPolicy,
    cache_policy: CachePolicy,
    default_range_days: u32,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        normalized: Arc<dyn NormalizedStore>,
        cache: Arc<dyn CacheStore>,
        status: Arc<dyn StatusStore>,
        runs: Arc<dyn RunStore>,
        directory: Arc<dyn CompanyDirectory>,
        providers: ProviderRegistry,
        batch: BatchPolicy,
        cache_policy: CachePolicy,
        default_range_days: u32,
    ) -> Self {
        Self {
            normalized,
            cache,
            status,
            runs,
            directory,
            providers,
            batch,
            cache_policy,
            default_range_days,
        }
    }

    /// The window a scheduled run refreshes: the trailing N full days
    /// ending yesterday.
    #[must_use]
    pub fn default_range(&self, today: NaiveDate) -> DateRange {
        DateRange::trailing_days(today - chrono::Duration::days(1), self.default_range_days)
    }

    /// Run a full synchronization cycle over `scope`.
    ///
    /// Re-running for the same range is safe: cache writes are atomic
    /// replaces and daily-row writes are upserts, so a second run yields
    /// identical state rather than duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only when the run itself cannot be
    /// enumerated or recorded; per-company failures are captured in the
    /// returned [`RunReport`].
    pub async fn run(&self, scope: SyncScope, trigger: &str) -> Result<RunReport, EngineError> {
        let company_ids = match scope {
            SyncScope::All => self.directory.company_ids().await?,
            SyncScope::Companies(ids) => ids,
        };

        let run_id = self.runs.create_run(trigger).await?;
        self.runs.start_run(run_id).await?;

        let range = self.default_range(Utc::now().date_naive());
        tracing::info!(
            run_id,
            companies = company_ids.len(),
            %range,
            batch_size = self.batch.batch_size,
            "sync: starting run"
        );

        let run_started = Instant::now();
        let mut outcomes: Vec<ItemOutcome> = Vec::with_capacity(company_ids.len());
        let mut timings: Vec<BatchTiming> = Vec::new();

        for (index, batch) in self.batch.partition(&company_ids).into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch.inter_batch_delay).await;
            }

            let batch_started = Instant::now();
            let results =
                join_all(batch.iter().map(|id| self.sync_company(*id, range))).await;

            for outcome in results {
                if let Err(e) = self.runs.record_item(run_id, &outcome).await {
                    tracing::warn!(run_id, company_id = outcome.company_id, error = %e,
                        "sync: failed to record item outcome");
                }
                outcomes.push(outcome);
            }

            timings.push(BatchTiming {
                index,
                items: batch.len(),
                duration_ms: millis(batch_started.elapsed()),
            });
        }

        let report = RunReport::build(outcomes, timings, millis(run_started.elapsed()));

        if report.all_failed() {
            let message = format!("all {} companies failed to sync", report.failed);
            if let Err(e) = self.runs.fail_run(run_id, &message).await {
                tracing::warn!(run_id, error = %e, "sync: failed to mark run failed");
            }
        } else if let Err(e) = self.runs.complete_run(run_id, &report).await {
            tracing::warn!(run_id, error = %e, "sync: failed to mark run complete");
        }

        tracing::info!(
            run_id,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "sync: run complete"
        );

        Ok(report)
    }

    /// Sync one company over `range`: the single-item code path, shared
    /// by batch runs and queued background refreshes.
    ///
    /// Never fails the caller: every failure mode is folded into the
    /// returned [`ItemOutcome`].
    pub async fn sync_company(&self, company_id: i64, range: DateRange) -> ItemOutcome {
        let started = Instant::now();

        let mappings = match self.directory.mappings(company_id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(company_id, error = %e, "sync: failed to load mappings");
                return ItemOutcome::errored(company_id, e.to_string(), millis(started.elapsed()));
            }
        };

        if mappings.is_empty() {
            tracing::debug!(company_id, "sync: no provider mappings; skipping");
            return ItemOutcome::skipped(company_id, millis(started.elapsed()));
        }

        let now = Utc::now();
        for mapping in &mappings {
            if let Err(e) = self.status.mark_syncing(company_id, mapping.platform, now).await {
                tracing::warn!(company_id, platform = %mapping.platform, error = %e,
                    "sync: failed to mark syncing");
            }
        }

        let fetches = join_all(
            mappings
                .iter()
                .map(|mapping| self.fetch_platform(mapping, range)),
        )
        .await;

        let mut bundle = MetricBundle::empty(company_id, range);
        let mut synced: Vec<Platform> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        let now = Utc::now();

        for (platform, result) in fetches {
            match result {
                Ok(fetched) => {
                    self.persist_normalized(company_id, &fetched, range).await;
                    if let Some(mut metrics) = summarize(&fetched.current, &fetched.previous) {
                        metrics.set_breakdowns(fetched.breakdowns);
                        bundle.set(metrics);
                    }
                    if let Err(e) = self
                        .status
                        .mark_success(company_id, platform, now, range)
                        .await
                    {
                        tracing::warn!(company_id, platform = %platform, error = %e,
                            "sync: failed to mark success");
                    }
                    synced.push(platform);
                }
                Err(message) => {
                    tracing::warn!(company_id, platform = %platform, error = %message,
                        "sync: platform fetch failed");
                    bundle.record_error(platform, message.clone());
                    if let Err(e) = self
                        .status
                        .mark_failure(company_id, platform, now, &message)
                        .await
                    {
                        tracing::warn!(company_id, platform = %platform, error = %e,
                            "sync: failed to mark failure");
                    }
                    failures.push(format!("{platform}: {message}"));
                }
            }
        }

        // The bundle write happens-after every platform fetch has joined,
        // so a partially fetched bundle is never persisted as a complete
        // refresh cycle.
        if !bundle.is_empty() {
            self.write_cache(&bundle, now).await;
        }

        let duration_ms = millis(started.elapsed());
        if synced.is_empty() {
            ItemOutcome::errored(company_id, failures.join("; "), duration_ms)
        } else {
            ItemOutcome {
                company_id,
                status: ItemStatus::Success,
                error: (!failures.is_empty()).then(|| failures.join("; ")),
                platforms_synced: synced,
                duration_ms,
            }
        }
    }

    /// Fetch one mapped platform, folding timeouts and provider errors
    /// into an error string so siblings are unaffected.
    async fn fetch_platform(
        &self,
        mapping: &Mapping,
        range: DateRange,
    ) -> (Platform, Result<pulseboard_providers::FetchedMetrics, String>) {
        let platform = mapping.platform;
        let client = match self.providers.get(platform) {
            Ok(c) => c,
            Err(e) => return (platform, Err(e.to_string())),
        };

        let previous = range.previous_period();
        let result = tokio::time::timeout(
            self.batch.fetch_timeout,
            client.fetch_metrics(&mapping.account_ref, range, previous),
        )
        .await;

        match result {
            Ok(Ok(fetched)) => (platform, Ok(fetched)),
            Ok(Err(e)) => (platform, Err(e.to_string())),
            Err(_) => (
                platform,
                Err(format!(
                    "fetch timed out after {}s",
                    self.batch.fetch_timeout.as_secs()
                )),
            ),
        }
    }

    /// Write fetched rows and breakdowns into normalized storage.
    ///
    /// Best-effort: a storage failure here degrades tier-1 reads but must
    /// not fail the platform that fetched successfully.
    async fn persist_normalized(
        &self,
        company_id: i64,
        fetched: &pulseboard_providers::FetchedMetrics,
        range: DateRange,
    ) {
        for rows in [&fetched.current, &fetched.previous] {
            if rows.is_empty() {
                continue;
            }
            if let Err(e) = self.normalized.upsert_daily_rows(company_id, rows).await {
                tracing::warn!(company_id, platform = %fetched.platform, error = %e,
                    "sync: failed to upsert daily rows");
            }
        }
        if !fetched.breakdowns.is_empty() {
            if let Err(e) = self
                .normalized
                .upsert_snapshot(company_id, fetched.platform, range.end, &fetched.breakdowns)
                .await
            {
                tracing::warn!(company_id, platform = %fetched.platform, error = %e,
                    "sync: failed to upsert snapshot");
            }
        }
    }

    /// Replace the company's cache entries for this range: the point
    /// entry with the standard expiry, and the longer-lived snapshot
    /// entry consulted after the point cache misses.
    async fn write_cache(&self, bundle: &MetricBundle, now: chrono::DateTime<Utc>) {
        let entries = [
            CacheEntry {
                company_id: bundle.company_id,
                range: bundle.range,
                kind: CacheKind::Point,
                payload: bundle.clone(),
                written_at: now,
                expires_at: now + self.cache_policy.hard_expiry,
            },
            CacheEntry {
                company_id: bundle.company_id,
                range: bundle.range,
                kind: CacheKind::Snapshot,
                payload: bundle.clone(),
                written_at: now,
                expires_at: now + self.cache_policy.retention,
            },
        ];
        for entry in entries {
            let kind = entry.kind;
            if let Err(e) = self.cache.put(entry).await {
                tracing::warn!(
                    company_id = bundle.company_id,
                    kind = kind.as_str(),
                    error = %e,
                    "sync: failed to write cache entry"
                );
            }
        }
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

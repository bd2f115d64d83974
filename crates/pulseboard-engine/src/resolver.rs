//! The tiered cache-resolution algorithm.
//!
//! For one company and date range, try the cheapest and most current
//! source first and degrade gracefully: normalized daily rows → fresh
//! point cache → stale cache → live provider fetch. A tier that errors
//! is treated as a miss; the caller only sees an error when every tier
//! produced nothing for every mapped platform.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use pulseboard_core::{CachePolicy, DateRange, Platform};
use pulseboard_metrics::{summarize, MetricBundle};
use pulseboard_providers::ProviderRegistry;

use crate::error::ResolveError;
use crate::portfolio::{PortfolioBundle, PortfolioTotals};
use crate::refresh::RefreshHandle;
use crate::store::{
    CacheEntry, CacheKind, CacheStore, CompanyDirectory, Freshness, Mapping, NormalizedStore,
    PortfolioStore,
};

/// Companies resolved concurrently within one portfolio request.
const PORTFOLIO_CONCURRENCY: usize = 8;

pub struct Resolver {
    normalized: Arc<dyn NormalizedStore>,
    cache: Arc<dyn CacheStore>,
    directory: Arc<dyn CompanyDirectory>,
    portfolio: Arc<dyn PortfolioStore>,
    providers: ProviderRegistry,
    refresh: Option<RefreshHandle>,
    policy: CachePolicy,
    fetch_timeout: Duration,
}

impl Resolver {
    pub fn new(
        normalized: Arc<dyn NormalizedStore>,
        cache: Arc<dyn CacheStore>,
        directory: Arc<dyn CompanyDirectory>,
        portfolio: Arc<dyn PortfolioStore>,
        providers: ProviderRegistry,
        policy: CachePolicy,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            normalized,
            cache,
            directory,
            portfolio,
            providers,
            refresh: None,
            policy,
            fetch_timeout,
        }
    }

    /// Attach the background-refresh queue. Without it, serving stale
    /// data simply skips the refresh step.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshHandle) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Resolve one company's metrics for a range through the tier chain.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotConnected`] if the company has no provider
    ///   mappings at all.
    /// - [`ResolveError::NoData`] if every tier produced nothing for
    ///   every mapped platform.
    /// - [`ResolveError::Store`] if the mapping lookup itself fails.
    pub async fn resolve(
        &self,
        company_id: i64,
        range: DateRange,
    ) -> Result<MetricBundle, ResolveError> {
        let mappings = self.directory.mappings(company_id).await?;
        if mappings.is_empty() {
            return Err(ResolveError::NotConnected(company_id));
        }

        let mut bundle = MetricBundle::empty(company_id, range);

        self.resolve_normalized(&mut bundle, &mappings, range).await;

        let mut served_stale = false;
        if !self.missing(&bundle, &mappings).is_empty() {
            served_stale |= self.resolve_fresh_cache(&mut bundle, &mappings, range).await;
        }
        if !self.missing(&bundle, &mappings).is_empty() {
            served_stale |= self.resolve_stale_cache(&mut bundle, &mappings, range).await;
        }

        let still_missing = self.missing(&bundle, &mappings);
        if !still_missing.is_empty() {
            self.resolve_live(&mut bundle, &mappings, &still_missing, range)
                .await;
        }

        if bundle.is_empty() {
            return Err(ResolveError::NoData { company_id, range });
        }

        if served_stale {
            if let Some(refresh) = &self.refresh {
                refresh.enqueue(company_id, range);
            }
        }

        Ok(bundle)
    }

    /// Mapped platforms the bundle still has no data for.
    fn missing(&self, bundle: &MetricBundle, mappings: &[Mapping]) -> Vec<Platform> {
        mappings
            .iter()
            .map(|m| m.platform)
            .filter(|p| !bundle.has_platform(*p))
            .collect()
    }

    /// Tier 1: aggregate durable daily rows for the exact range and its
    /// mirrored previous range.
    async fn resolve_normalized(
        &self,
        bundle: &mut MetricBundle,
        mappings: &[Mapping],
        range: DateRange,
    ) {
        let previous_range = range.previous_period();
        for mapping in mappings {
            let platform = mapping.platform;
            let current = match self
                .normalized
                .daily_rows(bundle.company_id, platform, range)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(company_id = bundle.company_id, platform = %platform,
                        error = %e, "resolve: normalized tier unavailable");
                    continue;
                }
            };
            if current.is_empty() {
                continue;
            }

            let previous = self
                .normalized
                .daily_rows(bundle.company_id, platform, previous_range)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(company_id = bundle.company_id, platform = %platform,
                        error = %e, "resolve: previous-period read failed");
                    pulseboard_metrics::PlatformRows::empty(platform)
                });

            if let Some(mut metrics) = summarize(&current, &previous) {
                match self
                    .normalized
                    .snapshot(bundle.company_id, platform, range.end)
                    .await
                {
                    Ok(Some(breakdowns)) => metrics.set_breakdowns(breakdowns),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(company_id = bundle.company_id, platform = %platform,
                            error = %e, "resolve: snapshot read failed");
                    }
                }
                bundle.set(metrics);
            }
        }
    }

    /// Tier 2: unexpired cache entries for the exact key, point kind
    /// before the longer-lived snapshot kind.
    ///
    /// Returns `true` if data was adopted from an entry already past the
    /// staleness threshold.
    async fn resolve_fresh_cache(
        &self,
        bundle: &mut MetricBundle,
        mappings: &[Mapping],
        range: DateRange,
    ) -> bool {
        let now = Utc::now();
        let mut served_stale = false;

        for kind in [CacheKind::Point, CacheKind::Snapshot] {
            let missing = self.missing(bundle, mappings);
            if missing.is_empty() {
                break;
            }
            let entry = match self.cache.get(bundle.company_id, range, kind).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(company_id = bundle.company_id, kind = kind.as_str(),
                        error = %e, "resolve: cache tier unavailable");
                    continue;
                }
            };

            let freshness = entry.freshness(now, &self.policy);
            if freshness == Freshness::Expired {
                continue;
            }
            for platform in missing {
                if bundle.adopt_platform(&entry.payload, platform)
                    && freshness == Freshness::Stale
                {
                    served_stale = true;
                }
            }
        }
        served_stale
    }

    /// Tier 3: expired entries still within the stale grace window,
    /// most recently written first. Anything adopted here is stale by
    /// definition.
    async fn resolve_stale_cache(
        &self,
        bundle: &mut MetricBundle,
        mappings: &[Mapping],
        range: DateRange,
    ) -> bool {
        let mut candidates: Vec<CacheEntry> = Vec::new();
        for kind in [CacheKind::Point, CacheKind::Snapshot] {
            match self
                .cache
                .get_stale(bundle.company_id, range, kind, self.policy.stale_grace)
                .await
            {
                Ok(Some(entry)) => candidates.push(entry),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(company_id = bundle.company_id, kind = kind.as_str(),
                        error = %e, "resolve: stale cache tier unavailable");
                }
            }
        }
        candidates.sort_by_key(|e| std::cmp::Reverse(e.written_at));

        let mut adopted = false;
        for entry in &candidates {
            for platform in self.missing(bundle, mappings) {
                adopted |= bundle.adopt_platform(&entry.payload, platform);
            }
        }
        adopted
    }

    /// Tier 4: live provider fetches for whatever is still missing,
    /// parallel across platforms with a hard per-call timeout. Fetched
    /// bundles are written through to the point cache.
    async fn resolve_live(
        &self,
        bundle: &mut MetricBundle,
        mappings: &[Mapping],
        still_missing: &[Platform],
        range: DateRange,
    ) {
        let previous_range = range.previous_period();
        let targets: Vec<&Mapping> = mappings
            .iter()
            .filter(|m| still_missing.contains(&m.platform))
            .collect();

        let fetches = futures::future::join_all(targets.iter().map(|mapping| async {
            let platform = mapping.platform;
            let client = match self.providers.get(platform) {
                Ok(c) => c,
                Err(e) => return (platform, Err(e.to_string())),
            };
            match tokio::time::timeout(
                self.fetch_timeout,
                client.fetch_metrics(&mapping.account_ref, range, previous_range),
            )
            .await
            {
                Ok(Ok(fetched)) => (platform, Ok(fetched)),
                Ok(Err(e)) => (platform, Err(e.to_string())),
                Err(_) => (
                    platform,
                    Err(format!(
                        "fetch timed out after {}s",
                        self.fetch_timeout.as_secs()
                    )),
                ),
            }
        }))
        .await;

        let mut fetched_any = false;
        for (platform, result) in fetches {
            match result {
                Ok(fetched) => {
                    if let Some(mut metrics) = summarize(&fetched.current, &fetched.previous) {
                        metrics.set_breakdowns(fetched.breakdowns);
                        bundle.set(metrics);
                        fetched_any = true;
                    }
                }
                Err(message) => {
                    tracing::warn!(company_id = bundle.company_id, platform = %platform,
                        error = %message, "resolve: live fetch failed");
                    bundle.record_error(platform, message);
                }
            }
        }

        if fetched_any {
            let now = Utc::now();
            let entry = CacheEntry {
                company_id: bundle.company_id,
                range,
                kind: CacheKind::Point,
                payload: bundle.clone(),
                written_at: now,
                expires_at: now + self.policy.hard_expiry,
            };
            if let Err(e) = self.cache.put(entry).await {
                tracing::warn!(company_id = bundle.company_id, error = %e,
                    "resolve: cache write-through failed");
            }
        }
    }

    /// Resolve a user's portfolio: every company they can see, resolved
    /// concurrently, rolled up, and cached for the rest of the calendar
    /// day.
    ///
    /// Individual company failures (not connected, no data) are logged
    /// and skipped; only a user with no companies at all is an error.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NoCompanies`] if the user has no companies.
    /// - [`ResolveError::Store`] if the company list cannot be read.
    pub async fn resolve_portfolio(
        &self,
        user_id: i64,
        range: DateRange,
    ) -> Result<PortfolioBundle, ResolveError> {
        let today = Utc::now().date_naive();

        match self.portfolio.get(user_id, today).await {
            Ok(Some(cached)) if cached.range == range => {
                tracing::debug!(user_id, "portfolio: serving same-day cache");
                return Ok(cached);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id, error = %e, "portfolio: cache read failed");
            }
        }

        let company_ids = self.directory.companies_for_user(user_id).await?;
        if company_ids.is_empty() {
            return Err(ResolveError::NoCompanies(user_id));
        }

        let results: Vec<(i64, Result<MetricBundle, ResolveError>)> =
            stream::iter(company_ids.clone())
                .map(|company_id| async move {
                    (company_id, self.resolve(company_id, range).await)
                })
                .buffer_unordered(PORTFOLIO_CONCURRENCY)
                .collect()
                .await;

        let mut companies: Vec<MetricBundle> = Vec::new();
        for (company_id, result) in results {
            match result {
                Ok(bundle) => companies.push(bundle),
                Err(e) => {
                    tracing::warn!(user_id, company_id, error = %e,
                        "portfolio: company resolution failed");
                }
            }
        }
        companies.sort_by_key(|b| b.company_id);

        let aggregate = PortfolioTotals::from_bundles(&companies);
        let bundle = PortfolioBundle {
            user_id,
            range,
            cache_date: today,
            companies,
            aggregate,
            updated_at: Utc::now(),
        };

        if let Err(e) = self.portfolio.put(user_id, today, &bundle).await {
            tracing::warn!(user_id, error = %e, "portfolio: cache write failed");
        }

        Ok(bundle)
    }
}

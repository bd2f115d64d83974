//! Resolver tier-chain tests against in-memory stores and scripted
//! providers.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::mpsc;

use pulseboard_core::{CachePolicy, Platform};
use pulseboard_metrics::PlatformRows;
use pulseboard_providers::ProviderRegistry;

use crate::error::ResolveError;
use crate::refresh::RefreshHandle;
use crate::resolver::Resolver;
use crate::store::CacheKind;
use crate::testing::{
    bundle_from_gsc, cache_entry, gsc_rows, test_range, MemoryCache, MemoryDirectory,
    MemoryNormalized, MemoryPortfolio, ProviderMode, ScriptedProvider,
};

struct Harness {
    normalized: Arc<MemoryNormalized>,
    cache: Arc<MemoryCache>,
    directory: Arc<MemoryDirectory>,
    portfolio: Arc<MemoryPortfolio>,
}

impl Harness {
    fn new(directory: MemoryDirectory) -> Self {
        Self {
            normalized: Arc::new(MemoryNormalized::default()),
            cache: Arc::new(MemoryCache::default()),
            directory: Arc::new(directory),
            portfolio: Arc::new(MemoryPortfolio::default()),
        }
    }

    fn resolver(&self, providers: ProviderRegistry) -> Resolver {
        Resolver::new(
            Arc::clone(&self.normalized) as _,
            Arc::clone(&self.cache) as _,
            Arc::clone(&self.directory) as _,
            Arc::clone(&self.portfolio) as _,
            providers,
            CachePolicy::default(),
            StdDuration::from_secs(2),
        )
    }
}

fn gsc_only_directory(company_id: i64) -> MemoryDirectory {
    MemoryDirectory::default().with_mapping(company_id, Platform::Gsc, "https://acme.example.com/")
}

#[tokio::test]
async fn normalized_rows_short_circuit_the_cache_tiers() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));
    harness.normalized.seed_rows(1, range, gsc_rows(range, 5));

    let provider = Arc::new(ScriptedProvider::new(
        Platform::Gsc,
        ProviderMode::Fail("must not be called".into()),
    ));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&provider) as _);

    let bundle = harness
        .resolver(registry)
        .resolve(1, range)
        .await
        .expect("resolve");

    assert!(bundle.has_platform(Platform::Gsc));
    assert_eq!(
        harness.cache.gets(),
        0,
        "normalized hit must not consult the point cache"
    );
    assert_eq!(provider.call_count(), 0, "no live fetch on a tier-1 hit");
    let gsc = bundle.gsc.expect("gsc metrics");
    assert_eq!(gsc.totals.clicks, 5 * range.days());
}

#[tokio::test]
async fn fresh_cache_entry_serves_without_refresh() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));
    harness.cache.seed(cache_entry(
        1,
        range,
        CacheKind::Point,
        bundle_from_gsc(1, range, 3),
        Duration::hours(1),
        Duration::hours(48),
    ));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let provider = Arc::new(ScriptedProvider::new(
        Platform::Gsc,
        ProviderMode::Fail("must not be called".into()),
    ));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&provider) as _);

    let bundle = harness
        .resolver(registry)
        .with_refresh(RefreshHandle::from_sender(tx))
        .resolve(1, range)
        .await
        .expect("resolve");

    assert!(bundle.has_platform(Platform::Gsc));
    assert_eq!(provider.call_count(), 0);
    assert!(
        rx.try_recv().is_err(),
        "a fresh cache hit must not schedule a refresh"
    );
}

#[tokio::test]
async fn stale_cache_entry_serves_and_schedules_refresh() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));
    // Written 13h ago with a 48h expiry: inside the fresh tier, past the
    // 12h staleness threshold.
    harness.cache.seed(cache_entry(
        1,
        range,
        CacheKind::Point,
        bundle_from_gsc(1, range, 3),
        Duration::hours(13),
        Duration::hours(48),
    ));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let bundle = harness
        .resolver(ProviderRegistry::new())
        .with_refresh(RefreshHandle::from_sender(tx))
        .resolve(1, range)
        .await
        .expect("resolve");

    assert!(bundle.has_platform(Platform::Gsc));
    let task = rx.try_recv().expect("refresh task scheduled");
    assert_eq!(task.company_id, 1);
    assert_eq!(task.range, range);
}

#[tokio::test]
async fn expired_entry_within_grace_serves_from_stale_tier() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));
    // Written 3 days ago, expired after 48h: only the stale tier may
    // serve it.
    harness.cache.seed(cache_entry(
        1,
        range,
        CacheKind::Point,
        bundle_from_gsc(1, range, 7),
        Duration::days(3),
        Duration::hours(48),
    ));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let bundle = harness
        .resolver(ProviderRegistry::new())
        .with_refresh(RefreshHandle::from_sender(tx))
        .resolve(1, range)
        .await
        .expect("resolve");

    assert!(bundle.has_platform(Platform::Gsc));
    assert!(rx.try_recv().is_ok(), "stale-tier data schedules a refresh");
}

#[tokio::test]
async fn entry_past_stale_grace_is_never_returned() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));
    // Written 10 days ago, expired after 48h: 8 days past expiry is
    // beyond the 7-day grace window.
    harness.cache.seed(cache_entry(
        1,
        range,
        CacheKind::Point,
        bundle_from_gsc(1, range, 7),
        Duration::days(10),
        Duration::hours(48),
    ));

    let err = harness
        .resolver(ProviderRegistry::new())
        .resolve(1, range)
        .await
        .expect_err("nothing servable");
    assert!(matches!(err, ResolveError::NoData { company_id: 1, .. }));
}

#[tokio::test]
async fn live_fetch_covers_only_mapped_platforms_and_writes_through() {
    let range = test_range();
    // Mapping only for gsc; normalized storage and cache both empty.
    let harness = Harness::new(gsc_only_directory(1));

    let gsc = Arc::new(ScriptedProvider::new(
        Platform::Gsc,
        ProviderMode::Rows(gsc_rows(range, 2), PlatformRows::empty(Platform::Gsc)),
    ));
    let ga = Arc::new(ScriptedProvider::new(
        Platform::Ga,
        ProviderMode::Fail("unmapped platform must not be fetched".into()),
    ));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&gsc) as _);
    registry.register(Arc::clone(&ga) as _);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let bundle = harness
        .resolver(registry)
        .with_refresh(RefreshHandle::from_sender(tx))
        .resolve(1, range)
        .await
        .expect("resolve");

    assert_eq!(gsc.call_count(), 1);
    assert_eq!(ga.call_count(), 0, "only mapped platforms are fetched");
    assert!(bundle.has_platform(Platform::Gsc));
    assert!(bundle.ga.is_none(), "unmapped platforms stay absent, not zero");
    assert!(bundle.yt.is_none());
    assert!(
        rx.try_recv().is_err(),
        "live data is current; no refresh is scheduled"
    );
    assert_eq!(harness.cache.puts(), 1, "live result is written through");
}

#[tokio::test]
async fn live_fetch_timeout_is_recorded_as_platform_error() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));

    let slow = Arc::new(ScriptedProvider::new(
        Platform::Gsc,
        ProviderMode::SlowRows(StdDuration::from_secs(30), gsc_rows(range, 2)),
    ));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&slow) as _);

    let err = harness
        .resolver(registry)
        .resolve(1, range)
        .await
        .expect_err("timeout with no other tier means no data");

    assert!(matches!(err, ResolveError::NoData { .. }));
}

#[tokio::test]
async fn no_mappings_is_not_connected() {
    let harness = Harness::new(MemoryDirectory::default().with_unmapped_company(9));
    let err = harness
        .resolver(ProviderRegistry::new())
        .resolve(9, test_range())
        .await
        .expect_err("no mappings");
    assert!(matches!(err, ResolveError::NotConnected(9)));
}

#[tokio::test]
async fn provider_returning_empty_rows_resolves_to_no_data() {
    let range = test_range();
    let harness = Harness::new(gsc_only_directory(1));
    let provider = Arc::new(ScriptedProvider::new(Platform::Gsc, ProviderMode::Empty));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&provider) as _);

    let err = harness
        .resolver(registry)
        .resolve(1, range)
        .await
        .expect_err("empty everywhere");

    assert_eq!(provider.call_count(), 1);
    assert!(matches!(err, ResolveError::NoData { .. }));
}

#[tokio::test]
async fn normalized_hit_on_one_platform_falls_back_per_platform() {
    let range = test_range();
    // gsc has normalized rows; yt must come from the cache.
    let directory = MemoryDirectory::default()
        .with_mapping(1, Platform::Gsc, "https://acme.example.com/")
        .with_mapping(1, Platform::Yt, "UCacme");
    let harness = Harness::new(directory);
    harness.normalized.seed_rows(1, range, gsc_rows(range, 5));

    let mut cached = pulseboard_metrics::MetricBundle::empty(1, range);
    cached.set(
        pulseboard_metrics::summarize(
            &PlatformRows::Yt {
                daily: vec![pulseboard_metrics::YtDailyRow {
                    date: range.start,
                    views: 400,
                    watch_time_minutes: 900.0,
                    subscribers_gained: 4,
                    subscribers_lost: 1,
                    avg_view_duration_secs: 75.0,
                }],
            },
            &PlatformRows::empty(Platform::Yt),
        )
        .expect("yt metrics"),
    );
    harness.cache.seed(cache_entry(
        1,
        range,
        CacheKind::Point,
        cached,
        Duration::hours(2),
        Duration::hours(48),
    ));

    let bundle = harness
        .resolver(ProviderRegistry::new())
        .resolve(1, range)
        .await
        .expect("resolve");

    assert!(bundle.has_platform(Platform::Gsc), "from normalized rows");
    assert!(bundle.has_platform(Platform::Yt), "from the point cache");
    let gsc = bundle.gsc.expect("gsc metrics");
    assert_eq!(gsc.totals.clicks, 5 * range.days(), "tier-1 data wins for gsc");
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn portfolio_resolves_companies_concurrently() {
    let range = test_range();
    let mut directory = MemoryDirectory::default();
    for company_id in 1..=3 {
        directory = directory.with_mapping(company_id, Platform::Gsc, "site");
    }
    directory = directory.with_user(77, &[1, 2, 3]);
    let harness = Harness::new(directory);

    // Each live fetch sleeps 100ms; serial resolution would take 300ms.
    let slow = Arc::new(ScriptedProvider::new(
        Platform::Gsc,
        ProviderMode::SlowRows(StdDuration::from_millis(100), gsc_rows(range, 1)),
    ));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&slow) as _);

    let started = std::time::Instant::now();
    let portfolio = harness
        .resolver(registry)
        .resolve_portfolio(77, range)
        .await
        .expect("portfolio");
    let elapsed = started.elapsed();

    assert_eq!(portfolio.companies.len(), 3);
    assert_eq!(portfolio.aggregate.companies_with_data, 3);
    assert_eq!(slow.call_count(), 3);
    assert!(
        elapsed < StdDuration::from_millis(250),
        "live fetches must overlap; took {elapsed:?}"
    );
}

#[tokio::test]
async fn portfolio_aggregates_and_caches_per_day() {
    let range = test_range();
    let directory = MemoryDirectory::default()
        .with_mapping(1, Platform::Gsc, "site-a")
        .with_mapping(2, Platform::Gsc, "site-b")
        .with_user(42, &[1, 2]);
    let harness = Harness::new(directory);
    harness.normalized.seed_rows(1, range, gsc_rows(range, 2));
    harness.normalized.seed_rows(2, range, gsc_rows(range, 3));

    let resolver = harness.resolver(ProviderRegistry::new());
    let portfolio = resolver.resolve_portfolio(42, range).await.expect("portfolio");

    assert_eq!(portfolio.aggregate.search_clicks, 5 * range.days());
    assert_eq!(portfolio.aggregate.companies_with_data, 2);
    assert_eq!(
        harness
            .portfolio
            .put_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1,
        "assembled portfolio is cached for the day"
    );

    // Second call within the same day is served from the portfolio
    // cache without re-reading the normalized tier.
    let reads_after_first = harness.normalized.daily_reads();
    let again = resolver.resolve_portfolio(42, range).await.expect("portfolio");
    assert_eq!(again.aggregate, portfolio.aggregate);
    assert_eq!(harness.normalized.daily_reads(), reads_after_first);
}

#[tokio::test]
async fn portfolio_skips_failing_companies_instead_of_failing() {
    let range = test_range();
    let directory = MemoryDirectory::default()
        .with_mapping(1, Platform::Gsc, "site-a")
        .with_unmapped_company(2)
        .with_user(42, &[1, 2]);
    let harness = Harness::new(directory);
    harness.normalized.seed_rows(1, range, gsc_rows(range, 2));

    let portfolio = harness
        .resolver(ProviderRegistry::new())
        .resolve_portfolio(42, range)
        .await
        .expect("portfolio");

    assert_eq!(portfolio.companies.len(), 1);
    assert_eq!(portfolio.aggregate.companies_with_data, 1);
}

#[tokio::test]
async fn user_without_companies_is_an_error() {
    let harness = Harness::new(MemoryDirectory::default());
    let err = harness
        .resolver(ProviderRegistry::new())
        .resolve_portfolio(5, test_range())
        .await
        .expect_err("no companies");
    assert!(matches!(err, ResolveError::NoCompanies(5)));
}

//! Database integration tests. Each test runs against a fresh schema via
//! `#[sqlx::test]` with the workspace migrations applied.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;

use pulseboard_core::{DateRange, Platform};
use pulseboard_engine::{
    classify, CacheEntry, CacheKind, DisplayStatus, ItemOutcome, ItemStatus, SyncState,
};
use pulseboard_metrics::{GscDailyRow, MetricBundle, PlatformRows, QueryStat, SnapshotBreakdowns};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
}

fn range() -> DateRange {
    DateRange::new(d(2025, 1, 1), d(2025, 1, 30)).expect("range")
}

async fn seed_company(pool: &PgPool, slug: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO companies (name, slug) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("Company {slug}"))
    .bind(slug)
    .fetch_one(pool)
    .await
    .expect("seed company")
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_rows_round_trip_per_platform(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let rows = PlatformRows::Gsc {
        daily: vec![
            GscDailyRow {
                date: d(2025, 1, 5),
                clicks: 10,
                impressions: 100,
                ctr: 0.1,
                position: 8.0,
            },
            GscDailyRow {
                date: d(2025, 1, 6),
                clicks: 30,
                impressions: 200,
                ctr: 0.15,
                position: 7.5,
            },
        ],
    };

    let written = pulseboard_db::daily::upsert_daily_rows(&pool, company_id, &rows)
        .await
        .expect("upsert");
    assert_eq!(written, 2);

    let fetched = pulseboard_db::daily::fetch_daily_rows(&pool, company_id, Platform::Gsc, range())
        .await
        .expect("fetch");
    assert_eq!(fetched, rows);

    // Upserting the same dates replaces, not duplicates.
    pulseboard_db::daily::upsert_daily_rows(&pool, company_id, &rows)
        .await
        .expect("second upsert");
    let fetched = pulseboard_db::daily::fetch_daily_rows(&pool, company_id, Platform::Gsc, range())
        .await
        .expect("fetch");
    assert_eq!(fetched.daily_count(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rows_outside_the_range_are_excluded(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let rows = PlatformRows::Gsc {
        daily: vec![
            GscDailyRow {
                date: d(2024, 12, 31),
                clicks: 99,
                impressions: 990,
                ctr: 0.1,
                position: 1.0,
            },
            GscDailyRow {
                date: d(2025, 1, 2),
                clicks: 5,
                impressions: 50,
                ctr: 0.1,
                position: 2.0,
            },
        ],
    };
    pulseboard_db::daily::upsert_daily_rows(&pool, company_id, &rows)
        .await
        .expect("upsert");

    let fetched = pulseboard_db::daily::fetch_daily_rows(&pool, company_id, Platform::Gsc, range())
        .await
        .expect("fetch");
    assert_eq!(fetched.daily_count(), 1, "the December row is out of range");
}

#[sqlx::test(migrations = "../../migrations")]
async fn snapshot_lookup_falls_back_to_closest_prior(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let early = SnapshotBreakdowns {
        top_queries: vec![QueryStat {
            query: "early".to_string(),
            clicks: 1,
            impressions: 10,
        }],
        ..SnapshotBreakdowns::default()
    };
    let late = SnapshotBreakdowns {
        top_queries: vec![QueryStat {
            query: "late".to_string(),
            clicks: 2,
            impressions: 20,
        }],
        ..SnapshotBreakdowns::default()
    };

    pulseboard_db::snapshots::upsert_snapshot(&pool, company_id, Platform::Gsc, d(2025, 1, 10), &early)
        .await
        .expect("upsert early");
    pulseboard_db::snapshots::upsert_snapshot(&pool, company_id, Platform::Gsc, d(2025, 1, 20), &late)
        .await
        .expect("upsert late");

    // No snapshot dated exactly Jan 15; the Jan 10 one is the closest prior.
    let found = pulseboard_db::snapshots::fetch_snapshot(&pool, company_id, Platform::Gsc, d(2025, 1, 15))
        .await
        .expect("fetch")
        .expect("snapshot");
    assert_eq!(found.top_queries[0].query, "early");

    let found = pulseboard_db::snapshots::fetch_snapshot(&pool, company_id, Platform::Gsc, d(2025, 1, 25))
        .await
        .expect("fetch")
        .expect("snapshot");
    assert_eq!(found.top_queries[0].query, "late");

    let none = pulseboard_db::snapshots::fetch_snapshot(&pool, company_id, Platform::Gsc, d(2025, 1, 5))
        .await
        .expect("fetch");
    assert!(none.is_none(), "no snapshot exists on or before Jan 5");
}

#[sqlx::test(migrations = "../../migrations")]
async fn cache_entries_respect_expiry_and_grace(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let now = Utc::now();

    let mut entry = CacheEntry {
        company_id,
        range: range(),
        kind: CacheKind::Point,
        payload: MetricBundle::empty(company_id, range()),
        written_at: now - Duration::hours(1),
        expires_at: now + Duration::hours(47),
    };
    pulseboard_db::cache::put_entry(&pool, &entry)
        .await
        .expect("put");

    let fresh = pulseboard_db::cache::get_entry(&pool, company_id, range(), CacheKind::Point)
        .await
        .expect("get");
    assert!(fresh.is_some(), "unexpired entry is served");

    // Replace with an expired entry: the fresh getter must refuse it, the
    // stale getter (7-day grace) must serve it.
    entry.written_at = now - Duration::days(3);
    entry.expires_at = now - Duration::days(1);
    pulseboard_db::cache::put_entry(&pool, &entry)
        .await
        .expect("replace");

    let fresh = pulseboard_db::cache::get_entry(&pool, company_id, range(), CacheKind::Point)
        .await
        .expect("get");
    assert!(fresh.is_none(), "expired entry must not be returned");

    let graced = pulseboard_db::cache::get_stale_entry(
        &pool,
        company_id,
        range(),
        CacheKind::Point,
        Duration::days(7).num_seconds(),
    )
    .await
    .expect("get stale");
    assert!(graced.is_some(), "expired entry within grace is served");

    let beyond = pulseboard_db::cache::get_stale_entry(
        &pool,
        company_id,
        range(),
        CacheKind::Point,
        Duration::hours(12).num_seconds(),
    )
    .await
    .expect("get stale");
    assert!(beyond.is_none(), "entry a day past expiry is outside a 12h grace");
}

#[sqlx::test(migrations = "../../migrations")]
async fn sweep_deletes_only_old_entries(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let now = Utc::now();

    let old = CacheEntry {
        company_id,
        range: range(),
        kind: CacheKind::Point,
        payload: MetricBundle::empty(company_id, range()),
        written_at: now - Duration::days(9),
        expires_at: now - Duration::days(7),
    };
    let recent = CacheEntry {
        kind: CacheKind::Snapshot,
        written_at: now - Duration::hours(2),
        expires_at: now + Duration::days(7),
        ..old.clone()
    };
    pulseboard_db::cache::put_entry(&pool, &old).await.expect("put old");
    pulseboard_db::cache::put_entry(&pool, &recent).await.expect("put recent");

    let removed = pulseboard_db::cache::sweep_entries(&pool, now - Duration::days(7))
        .await
        .expect("sweep");
    assert_eq!(removed, 1);

    let survivor = pulseboard_db::cache::get_entry(&pool, company_id, range(), CacheKind::Snapshot)
        .await
        .expect("get");
    assert!(survivor.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn status_transitions_follow_the_state_machine(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let now = Utc::now();

    pulseboard_db::status::mark_syncing(&pool, company_id, Platform::Ga, now)
        .await
        .expect("mark syncing");
    let records = pulseboard_db::status::list_status(&pool, Some(&[company_id]))
        .await
        .expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, SyncState::Syncing);
    assert_eq!(classify(&records[0], now), DisplayStatus::Syncing);

    pulseboard_db::status::mark_failure(&pool, company_id, Platform::Ga, now, "timeout")
        .await
        .expect("mark failure");
    pulseboard_db::status::mark_failure(&pool, company_id, Platform::Ga, now, "timeout again")
        .await
        .expect("mark failure");
    let records = pulseboard_db::status::list_status(&pool, Some(&[company_id]))
        .await
        .expect("list");
    assert_eq!(records[0].state, SyncState::Error);
    assert_eq!(records[0].consecutive_failures, 2);
    assert_eq!(records[0].last_error.as_deref(), Some("timeout again"));

    pulseboard_db::status::mark_success(&pool, company_id, Platform::Ga, now, range())
        .await
        .expect("mark success");
    let records = pulseboard_db::status::list_status(&pool, Some(&[company_id]))
        .await
        .expect("list");
    assert_eq!(records[0].state, SyncState::Success);
    assert_eq!(records[0].consecutive_failures, 0);
    assert!(records[0].last_error.is_none());
    assert_eq!(records[0].data_start_date, Some(range().start));
    assert_eq!(records[0].data_end_date, Some(range().end));
    assert_eq!(classify(&records[0], now), DisplayStatus::Ok);
}

#[sqlx::test(migrations = "../../migrations")]
async fn success_widens_the_covered_data_window(pool: PgPool) {
    let company_id = seed_company(&pool, "acme").await;
    let now = Utc::now();

    let january = range();
    let february = DateRange::new(d(2025, 2, 1), d(2025, 2, 28)).expect("range");

    pulseboard_db::status::mark_success(&pool, company_id, Platform::Yt, now, february)
        .await
        .expect("mark success");
    pulseboard_db::status::mark_success(&pool, company_id, Platform::Yt, now, january)
        .await
        .expect("mark success");

    let records = pulseboard_db::status::list_status(&pool, Some(&[company_id]))
        .await
        .expect("list");
    assert_eq!(records[0].data_start_date, Some(january.start));
    assert_eq!(records[0].data_end_date, Some(february.end));
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_run_lifecycle_enforces_transitions(pool: PgPool) {
    let run_id = pulseboard_db::create_sync_run(&pool, "cron").await.expect("create");

    // Completing a queued run is an invalid transition.
    let report = pulseboard_engine::RunReport::build(Vec::new(), Vec::new(), 0);
    let err = pulseboard_db::complete_sync_run(&pool, run_id, &report)
        .await
        .expect_err("must require running status");
    assert!(matches!(
        err,
        pulseboard_db::DbError::InvalidRunTransition { .. }
    ));

    pulseboard_db::start_sync_run(&pool, run_id).await.expect("start");

    let outcome = ItemOutcome {
        company_id: 1,
        status: ItemStatus::Success,
        error: None,
        platforms_synced: vec![Platform::Ga, Platform::Gsc],
        duration_ms: 420,
    };
    pulseboard_db::upsert_sync_run_company(&pool, run_id, &outcome)
        .await
        .expect("record item");

    let report = pulseboard_engine::RunReport::build(vec![outcome], Vec::new(), 420);
    pulseboard_db::complete_sync_run(&pool, run_id, &report)
        .await
        .expect("complete");

    let run = pulseboard_db::get_sync_run(&pool, run_id).await.expect("get");
    assert_eq!(run.status, "succeeded");
    assert_eq!(run.companies_processed, 1);

    let items = pulseboard_db::list_sync_run_companies(&pool, run_id)
        .await
        .expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].platforms_synced, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_companies_upserts_mappings(pool: PgPool) {
    let file = pulseboard_core::CompaniesFile {
        companies: vec![pulseboard_core::CompanyConfig {
            name: "Acme Coffee".to_string(),
            ga_property: Some("properties/1".to_string()),
            gsc_site: Some("https://acme.example.com/".to_string()),
            yt_channel: None,
            li_org: None,
            notes: None,
        }],
    };

    let (companies, mappings) = pulseboard_db::seed_companies(&pool, &file)
        .await
        .expect("seed");
    assert_eq!((companies, mappings), (1, 2));

    let company = pulseboard_db::get_company_by_slug(&pool, "acme-coffee")
        .await
        .expect("query")
        .expect("company");
    let found = pulseboard_db::list_mappings(&pool, company.id).await.expect("mappings");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].platform, Platform::Ga);

    // Seeding again replaces rather than duplicates.
    pulseboard_db::seed_companies(&pool, &file).await.expect("re-seed");
    let found = pulseboard_db::list_mappings(&pool, company.id).await.expect("mappings");
    assert_eq!(found.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn user_company_access_joins_active_companies_only(pool: PgPool) {
    let active = seed_company(&pool, "active-co").await;
    let inactive = seed_company(&pool, "inactive-co").await;
    sqlx::query("UPDATE companies SET is_active = FALSE WHERE id = $1")
        .bind(inactive)
        .execute(&pool)
        .await
        .expect("deactivate");

    let user_id =
        pulseboard_db::upsert_user_with_companies(&pool, "ops@example.com", &[active, inactive])
            .await
            .expect("user");

    let visible = pulseboard_db::companies_for_user(&pool, user_id)
        .await
        .expect("companies");
    assert_eq!(visible, vec![active]);
}

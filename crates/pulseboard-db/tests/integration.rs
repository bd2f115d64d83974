//! Offline unit tests for pulseboard-db pool configuration and row types.
//! These tests do not require a live database connection.

use pulseboard_db::{PoolConfig, SyncRunCompanyRow, SyncRunRow};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = sample_app_config();
    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn sample_app_config() -> pulseboard_core::AppConfig {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::path::PathBuf;

    pulseboard_core::AppConfig {
        database_url: "postgres://example".to_string(),
        env: pulseboard_core::Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        companies_path: PathBuf::from("./config/companies.yaml"),
        sync_secret: Some("secret".to_string()),
        ga_api_key: None,
        gsc_api_key: None,
        yt_api_key: None,
        li_api_key: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        provider_timeout_secs: 15,
        provider_max_retries: 2,
        provider_retry_backoff_base_ms: 500,
        sync_batch_size: 3,
        sync_inter_batch_delay_ms: 1500,
        sync_cron: "0 0 4 * * *".to_string(),
        sweep_cron: "0 30 5 * * *".to_string(),
        cache_staleness_hours: 12,
        cache_hard_expiry_hours: 48,
        cache_stale_grace_days: 7,
        cache_retention_days: 7,
        default_range_days: 30,
    }
}

/// Compile-time smoke test: confirm that [`SyncRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn sync_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = SyncRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cron".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        companies_processed: 0_i32,
        companies_failed: 0_i32,
        companies_skipped: 0_i32,
        duration_ms: None,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.trigger_source, "cron");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert!(row.duration_ms.is_none());
}

#[test]
fn sync_run_company_row_has_expected_fields() {
    use chrono::Utc;

    let row = SyncRunCompanyRow {
        id: 9_i64,
        sync_run_id: 1_i64,
        company_id: 4_i64,
        status: "success".to_string(),
        platforms_synced: 3_i32,
        error_message: None,
        duration_ms: 1_250_i64,
        created_at: Utc::now(),
    };

    assert_eq!(row.sync_run_id, 1);
    assert_eq!(row.company_id, 4);
    assert_eq!(row.platforms_synced, 3);
    assert!(row.error_message.is_none());
}

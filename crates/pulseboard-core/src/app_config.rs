use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub companies_path: PathBuf,
    pub sync_secret: Option<String>,
    pub ga_api_key: Option<String>,
    pub gsc_api_key: Option<String>,
    pub yt_api_key: Option<String>,
    pub li_api_key: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
    pub provider_retry_backoff_base_ms: u64,
    pub sync_batch_size: usize,
    pub sync_inter_batch_delay_ms: u64,
    pub sync_cron: String,
    pub sweep_cron: String,
    pub cache_staleness_hours: i64,
    pub cache_hard_expiry_hours: i64,
    pub cache_stale_grace_days: i64,
    pub cache_retention_days: i64,
    pub default_range_days: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("companies_path", &self.companies_path)
            .field("database_url", &"[redacted]")
            .field("sync_secret", &self.sync_secret.as_ref().map(|_| "[redacted]"))
            .field("ga_api_key", &self.ga_api_key.as_ref().map(|_| "[redacted]"))
            .field("gsc_api_key", &self.gsc_api_key.as_ref().map(|_| "[redacted]"))
            .field("yt_api_key", &self.yt_api_key.as_ref().map(|_| "[redacted]"))
            .field("li_api_key", &self.li_api_key.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_max_retries", &self.provider_max_retries)
            .field(
                "provider_retry_backoff_base_ms",
                &self.provider_retry_backoff_base_ms,
            )
            .field("sync_batch_size", &self.sync_batch_size)
            .field("sync_inter_batch_delay_ms", &self.sync_inter_batch_delay_ms)
            .field("sync_cron", &self.sync_cron)
            .field("sweep_cron", &self.sweep_cron)
            .field("cache_staleness_hours", &self.cache_staleness_hours)
            .field("cache_hard_expiry_hours", &self.cache_hard_expiry_hours)
            .field("cache_stale_grace_days", &self.cache_stale_grace_days)
            .field("cache_retention_days", &self.cache_retention_days)
            .field("default_range_days", &self.default_range_days)
            .finish()
    }
}

impl AppConfig {
    /// Cache freshness thresholds derived from the configured hours/days.
    #[must_use]
    pub fn cache_policy(&self) -> crate::CachePolicy {
        crate::CachePolicy {
            staleness: chrono::Duration::hours(self.cache_staleness_hours),
            hard_expiry: chrono::Duration::hours(self.cache_hard_expiry_hours),
            stale_grace: chrono::Duration::days(self.cache_stale_grace_days),
            retention: chrono::Duration::days(self.cache_retention_days),
        }
    }

    /// Batch shaping parameters for the sync orchestrator.
    #[must_use]
    pub fn batch_policy(&self) -> crate::BatchPolicy {
        crate::BatchPolicy {
            batch_size: self.sync_batch_size.max(1),
            inter_batch_delay: std::time::Duration::from_millis(self.sync_inter_batch_delay_ms),
            fetch_timeout: std::time::Duration::from_secs(self.provider_timeout_secs),
        }
    }
}

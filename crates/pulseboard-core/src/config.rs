use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PULSE_ENV", "development"));

    let sync_secret = lookup("PULSE_SYNC_SECRET").ok();
    if sync_secret.is_none() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("PULSE_SYNC_SECRET".to_string()));
    }

    let bind_addr = parse_addr("PULSE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PULSE_LOG_LEVEL", "info");
    let companies_path = PathBuf::from(or_default(
        "PULSE_COMPANIES_PATH",
        "./config/companies.yaml",
    ));

    let ga_api_key = lookup("PULSE_GA_API_KEY").ok();
    let gsc_api_key = lookup("PULSE_GSC_API_KEY").ok();
    let yt_api_key = lookup("PULSE_YT_API_KEY").ok();
    let li_api_key = lookup("PULSE_LI_API_KEY").ok();

    let db_max_connections = parse_u32("PULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let provider_timeout_secs = parse_u64("PULSE_PROVIDER_TIMEOUT_SECS", "15")?;
    let provider_max_retries = parse_u32("PULSE_PROVIDER_MAX_RETRIES", "2")?;
    let provider_retry_backoff_base_ms = parse_u64("PULSE_PROVIDER_RETRY_BACKOFF_BASE_MS", "500")?;

    let sync_batch_size = parse_usize("PULSE_SYNC_BATCH_SIZE", "3")?;
    let sync_inter_batch_delay_ms = parse_u64("PULSE_SYNC_INTER_BATCH_DELAY_MS", "1500")?;
    let sync_cron = or_default("PULSE_SYNC_CRON", "0 0 4 * * *");
    let sweep_cron = or_default("PULSE_SWEEP_CRON", "0 30 5 * * *");

    let cache_staleness_hours = parse_i64("PULSE_CACHE_STALENESS_HOURS", "12")?;
    let cache_hard_expiry_hours = parse_i64("PULSE_CACHE_HARD_EXPIRY_HOURS", "48")?;
    let cache_stale_grace_days = parse_i64("PULSE_CACHE_STALE_GRACE_DAYS", "7")?;
    let cache_retention_days = parse_i64("PULSE_CACHE_RETENTION_DAYS", "7")?;

    let default_range_days = parse_u32("PULSE_DEFAULT_RANGE_DAYS", "30")?;

    if cache_staleness_hours >= cache_hard_expiry_hours {
        return Err(ConfigError::Validation(format!(
            "PULSE_CACHE_STALENESS_HOURS ({cache_staleness_hours}) must be below \
             PULSE_CACHE_HARD_EXPIRY_HOURS ({cache_hard_expiry_hours})"
        )));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        companies_path,
        sync_secret,
        ga_api_key,
        gsc_api_key,
        yt_api_key,
        li_api_key,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        provider_timeout_secs,
        provider_max_retries,
        provider_retry_backoff_base_ms,
        sync_batch_size,
        sync_inter_batch_delay_ms,
        sync_cron,
        sweep_cron,
        cache_staleness_hours,
        cache_hard_expiry_hours,
        cache_stale_grace_days,
        cache_retention_days,
        default_range_days,
    })
}

fn parse_environment(raw: &str) -> Environment {
    match raw.to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, std::env::VarError> + 'a {
        move |key: &str| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(std::env::VarError::NotPresent)
        }
    }

    fn minimal_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([("DATABASE_URL", "postgres://localhost/pulseboard")])
    }

    #[test]
    fn applies_defaults_for_optional_vars() {
        let env = minimal_env();
        let config = build_app_config(lookup_from(&env)).expect("config");

        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.sync_batch_size, 3);
        assert_eq!(config.provider_timeout_secs, 15);
        assert_eq!(config.cache_staleness_hours, 12);
        assert_eq!(config.cache_hard_expiry_hours, 48);
        assert_eq!(config.default_range_days, 30);
        assert!(config.sync_secret.is_none());
    }

    #[test]
    fn requires_database_url() {
        let env = HashMap::new();
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "DATABASE_URL"));
    }

    #[test]
    fn requires_sync_secret_outside_development() {
        let mut env = minimal_env();
        env.insert("PULSE_ENV", "production");
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "PULSE_SYNC_SECRET"));

        env.insert("PULSE_SYNC_SECRET", "topsecret");
        let config = build_app_config(lookup_from(&env)).expect("config");
        assert_eq!(config.env, Environment::Production);
    }

    #[test]
    fn rejects_staleness_at_or_above_hard_expiry() {
        let mut env = minimal_env();
        env.insert("PULSE_CACHE_STALENESS_HOURS", "48");
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_unparseable_numeric_var() {
        let mut env = minimal_env();
        env.insert("PULSE_SYNC_BATCH_SIZE", "three");
        let err = build_app_config(lookup_from(&env)).expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidEnvVar { ref var, .. } if var == "PULSE_SYNC_BATCH_SIZE"
        ));
    }
}

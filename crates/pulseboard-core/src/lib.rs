use thiserror::Error;

pub mod app_config;
pub mod companies;
pub mod config;
pub mod platform;
pub mod policy;
pub mod range;

pub use app_config::{AppConfig, Environment};
pub use companies::{load_companies, CompaniesFile, CompanyConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use platform::Platform;
pub use policy::{BatchPolicy, CachePolicy};
pub use range::DateRange;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read companies file {path}: {source}")]
    CompaniesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse companies file: {0}")]
    CompaniesFileParse(#[from] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

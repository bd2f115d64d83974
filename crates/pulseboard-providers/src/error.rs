use thiserror::Error;

use pulseboard_core::Platform;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {platform} provider (retry after {retry_after_secs}s)")]
    RateLimited {
        platform: Platform,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("provider API error: {0}")]
    ApiError(String),

    #[error("no API credentials configured for {0}")]
    MissingCredentials(Platform),

    #[error("no provider client registered for {0}")]
    NotRegistered(Platform),
}

//! Search-performance provider client.

use serde::Deserialize;

use async_trait::async_trait;
use pulseboard_core::{DateRange, Platform};
use pulseboard_metrics::{GscDailyRow, PlatformRows, QueryStat, SnapshotBreakdowns};

use crate::client::{FetchedMetrics, ProviderClient};
use crate::error::ProviderError;
use crate::http::{parse_payload, ApiClient, ProviderSettings};

const DEFAULT_BASE_URL: &str = "https://searchapi.example.com/";

/// Client for the search-performance reporting API.
pub struct GscClient {
    api: ApiClient,
}

#[derive(Debug, Deserialize)]
struct GscPayload {
    #[serde(default)]
    daily: Vec<GscDailyRow>,
    #[serde(default)]
    previous: Vec<GscDailyRow>,
    #[serde(default)]
    top_queries: Vec<QueryStat>,
}

impl GscClient {
    /// Creates a client pointed at the production reporting API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, settings, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProviderError::ApiError`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        settings: &ProviderSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api: ApiClient::new(Platform::Gsc, api_key, settings, base_url)?,
        })
    }
}

#[async_trait]
impl ProviderClient for GscClient {
    fn platform(&self) -> Platform {
        Platform::Gsc
    }

    async fn fetch_metrics(
        &self,
        account_ref: &str,
        range: DateRange,
        previous: DateRange,
    ) -> Result<FetchedMetrics, ProviderError> {
        let body = self
            .api
            .get_json(
                "v1/sites/performance",
                &[
                    ("site", account_ref),
                    ("start", &range.start.to_string()),
                    ("end", &range.end.to_string()),
                    ("prev_start", &previous.start.to_string()),
                    ("prev_end", &previous.end.to_string()),
                ],
            )
            .await?;

        let payload: GscPayload =
            parse_payload(body, &format!("gsc performance(site={account_ref})"))?;

        Ok(FetchedMetrics {
            platform: Platform::Gsc,
            current: PlatformRows::Gsc {
                daily: payload.daily,
            },
            previous: PlatformRows::Gsc {
                daily: payload.previous,
            },
            breakdowns: SnapshotBreakdowns {
                top_queries: payload.top_queries,
                ..SnapshotBreakdowns::default()
            },
        })
    }
}

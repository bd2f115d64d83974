//! Web-analytics provider client.

use serde::Deserialize;

use async_trait::async_trait;
use pulseboard_core::{DateRange, Platform};
use pulseboard_metrics::{GaChannelRow, GaDailyRow, PageStat, PlatformRows, SnapshotBreakdowns};

use crate::client::{FetchedMetrics, ProviderClient};
use crate::error::ProviderError;
use crate::http::{parse_payload, ApiClient, ProviderSettings};

const DEFAULT_BASE_URL: &str = "https://analyticsapi.example.com/";

/// Client for the web-analytics reporting API.
///
/// Use [`GaClient::new`] for production or [`GaClient::with_base_url`] to
/// point at a mock server in tests.
pub struct GaClient {
    api: ApiClient,
}

#[derive(Debug, Deserialize)]
struct GaPayload {
    #[serde(default)]
    daily: Vec<GaDailyRow>,
    #[serde(default)]
    previous: Vec<GaDailyRow>,
    #[serde(default)]
    channels: Vec<GaChannelRow>,
    #[serde(default)]
    top_pages: Vec<PageStat>,
}

impl GaClient {
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
            api: ApiClient::new(Platform::Ga, api_key, settings, base_url)?,
        })
    }
}

#[async_trait]
impl ProviderClient for GaClient {
    fn platform(&self) -> Platform {
        Platform::Ga
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
                "v1/properties/report",
                &[
                    ("property", account_ref),
                    ("start", &range.start.to_string()),
                    ("end", &range.end.to_string()),
                    ("prev_start", &previous.start.to_string()),
                    ("prev_end", &previous.end.to_string()),
                ],
            )
            .await?;

        let payload: GaPayload =
            parse_payload(body, &format!("ga report(property={account_ref})"))?;

        Ok(FetchedMetrics {
            platform: Platform::Ga,
            current: PlatformRows::Ga {
                daily: payload.daily,
                channels: payload.channels,
            },
            previous: PlatformRows::Ga {
                daily: payload.previous,
                channels: Vec::new(),
            },
            breakdowns: SnapshotBreakdowns {
                top_pages: payload.top_pages,
                ..SnapshotBreakdowns::default()
            },
        })
    }
}

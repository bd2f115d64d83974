//! Professional-network provider client.

use serde::Deserialize;

use async_trait::async_trait;
use pulseboard_core::{DateRange, Platform};
use pulseboard_metrics::{LiDailyRow, PlatformRows, SegmentShare, SnapshotBreakdowns};

use crate::client::{FetchedMetrics, ProviderClient};
use crate::error::ProviderError;
use crate::http::{parse_payload, ApiClient, ProviderSettings};

const DEFAULT_BASE_URL: &str = "https://socialapi.example.com/";

/// Client for the professional-network organization statistics API.
pub struct LiClient {
    api: ApiClient,
}

#[derive(Debug, Deserialize)]
struct LiPayload {
    #[serde(default)]
    daily: Vec<LiDailyRow>,
    #[serde(default)]
    previous: Vec<LiDailyRow>,
    #[serde(default)]
    demographics: Vec<SegmentShare>,
}

impl LiClient {
    /// Creates a client pointed at the production statistics API.
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
            api: ApiClient::new(Platform::Li, api_key, settings, base_url)?,
        })
    }
}

#[async_trait]
impl ProviderClient for LiClient {
    fn platform(&self) -> Platform {
        Platform::Li
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
                "v1/organizations/statistics",
                &[
                    ("org", account_ref),
                    ("start", &range.start.to_string()),
                    ("end", &range.end.to_string()),
                    ("prev_start", &previous.start.to_string()),
                    ("prev_end", &previous.end.to_string()),
                ],
            )
            .await?;

        let payload: LiPayload =
            parse_payload(body, &format!("li statistics(org={account_ref})"))?;

        Ok(FetchedMetrics {
            platform: Platform::Li,
            current: PlatformRows::Li {
                daily: payload.daily,
            },
            previous: PlatformRows::Li {
                daily: payload.previous,
            },
            breakdowns: SnapshotBreakdowns {
                demographics: payload.demographics,
                ..SnapshotBreakdowns::default()
            },
        })
    }
}

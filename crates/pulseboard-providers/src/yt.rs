//! Video-platform provider client.

use serde::Deserialize;

use async_trait::async_trait;
use pulseboard_core::{DateRange, Platform};
use pulseboard_metrics::{PlatformRows, SegmentShare, SnapshotBreakdowns, VideoStat, YtDailyRow};

use crate::client::{FetchedMetrics, ProviderClient};
use crate::error::ProviderError;
use crate::http::{parse_payload, ApiClient, ProviderSettings};

const DEFAULT_BASE_URL: &str = "https://videoapi.example.com/";

/// Client for the video-platform analytics API.
pub struct YtClient {
    api: ApiClient,
}

#[derive(Debug, Deserialize)]
struct YtPayload {
    #[serde(default)]
    daily: Vec<YtDailyRow>,
    #[serde(default)]
    previous: Vec<YtDailyRow>,
    #[serde(default)]
    top_videos: Vec<VideoStat>,
    #[serde(default)]
    demographics: Vec<SegmentShare>,
}

impl YtClient {
    /// Creates a client pointed at the production analytics API.
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
            api: ApiClient::new(Platform::Yt, api_key, settings, base_url)?,
        })
    }
}

#[async_trait]
impl ProviderClient for YtClient {
    fn platform(&self) -> Platform {
        Platform::Yt
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
                "v1/channels/analytics",
                &[
                    ("channel", account_ref),
                    ("start", &range.start.to_string()),
                    ("end", &range.end.to_string()),
                    ("prev_start", &previous.start.to_string()),
                    ("prev_end", &previous.end.to_string()),
                ],
            )
            .await?;

        let payload: YtPayload =
            parse_payload(body, &format!("yt analytics(channel={account_ref})"))?;

        Ok(FetchedMetrics {
            platform: Platform::Yt,
            current: PlatformRows::Yt {
                daily: payload.daily,
            },
            previous: PlatformRows::Yt {
                daily: payload.previous,
            },
            breakdowns: SnapshotBreakdowns {
                top_videos: payload.top_videos,
                demographics: payload.demographics,
                ..SnapshotBreakdowns::default()
            },
        })
    }
}

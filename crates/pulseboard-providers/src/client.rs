//! The provider seam: one trait, four implementations, and a registry the
//! engine fans out over.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use pulseboard_core::{AppConfig, DateRange, Platform};
use pulseboard_metrics::{PlatformRows, SnapshotBreakdowns};

use crate::error::ProviderError;
use crate::http::ProviderSettings;
use crate::{GaClient, GscClient, LiClient, YtClient};

/// Everything one provider returns for one company and one period pair.
///
/// Missing data is an empty row set, not an error: providers only fail on
/// genuine fetch failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMetrics {
    pub platform: Platform,
    pub current: PlatformRows,
    pub previous: PlatformRows,
    pub breakdowns: SnapshotBreakdowns,
}

/// A client for one external analytics platform.
///
/// Implementations must be safely callable concurrently; the orchestrator
/// fetches all of a company's platforms at once.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch daily rows for `range` and `previous`, plus snapshot
    /// breakdowns, for the account identified by `account_ref`.
    async fn fetch_metrics(
        &self,
        account_ref: &str,
        range: DateRange,
        previous: DateRange,
    ) -> Result<FetchedMetrics, ProviderError>;
}

/// Platform-keyed set of provider clients.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    clients: BTreeMap<Platform, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every platform with an API key configured.
    ///
    /// Platforms without credentials are left unregistered; a company
    /// mapped to one of them records a per-platform error at fetch time
    /// instead of failing the whole run.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if an underlying HTTP client cannot be
    /// constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let settings = ProviderSettings {
            timeout_secs: config.provider_timeout_secs,
            max_retries: config.provider_max_retries,
            backoff_base_ms: config.provider_retry_backoff_base_ms,
        };

        let mut registry = Self::new();
        if let Some(key) = config.ga_api_key.as_deref() {
            registry.register(Arc::new(GaClient::new(key, &settings)?));
        }
        if let Some(key) = config.gsc_api_key.as_deref() {
            registry.register(Arc::new(GscClient::new(key, &settings)?));
        }
        if let Some(key) = config.yt_api_key.as_deref() {
            registry.register(Arc::new(YtClient::new(key, &settings)?));
        }
        if let Some(key) = config.li_api_key.as_deref() {
            registry.register(Arc::new(LiClient::new(key, &settings)?));
        }
        Ok(registry)
    }

    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.platform(), client);
    }

    /// Look up the client for `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotRegistered`] when no client was
    /// configured for the platform.
    pub fn get(&self, platform: Platform) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        self.clients
            .get(&platform)
            .cloned()
            .ok_or(ProviderError::NotRegistered(platform))
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.clients.keys().copied().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

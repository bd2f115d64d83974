//! Shared HTTP plumbing for the four provider clients.
//!
//! Each provider speaks a small JSON envelope: a `"status"` field of
//! `"ok"` or `"error"` plus the payload. [`ApiClient`] owns the reqwest
//! client, API key header, base-URL handling, and envelope checking so
//! the per-platform clients only parse their typed payloads.

use std::time::Duration;

use reqwest::{Client, Url};

use pulseboard_core::Platform;

use crate::error::ProviderError;

const USER_AGENT: &str = "pulseboard/0.1 (marketing-analytics)";

pub(crate) struct ApiClient {
    client: Client,
    api_key: String,
    base_url: Url,
    platform: Platform,
    max_retries: u32,
    backoff_base_ms: u64,
}

/// Connection and retry settings shared by all provider clients.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl ApiClient {
    pub(crate) fn new(
        platform: Platform,
        api_key: &str,
        settings: &ProviderSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so
        // joined paths resolve under it rather than replacing the last
        // path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ProviderError::ApiError(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            platform,
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
        })
    }

    /// GET `path` under the base URL with `query` parameters, retrying
    /// transient failures, and return the envelope-checked JSON body.
    pub(crate) async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ProviderError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProviderError::ApiError(format!("invalid path '{path}': {e}")))?;

        crate::retry::retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_once(url.clone(), query)
        })
        .await
    }

    async fn request_once(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .get(url.clone())
            .header("x-api-key", &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                platform: self.platform,
                retry_after_secs,
            });
        }
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        check_api_error(&body)?;
        Ok(body)
    }
}

/// Surface API-level errors reported inside a 200 response envelope.
fn check_api_error(body: &serde_json::Value) -> Result<(), ProviderError> {
    if body.get("status").and_then(|s| s.as_str()) == Some("error") {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unspecified provider error");
        return Err(ProviderError::ApiError(message.to_owned()));
    }
    Ok(())
}

/// Parse the envelope-checked body into the provider's typed payload.
pub(crate) fn parse_payload<T: serde::de::DeserializeOwned>(
    body: serde_json::Value,
    context: &str,
) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_is_surfaced() {
        let body = serde_json::json!({"status": "error", "message": "unknown property"});
        let err = check_api_error(&body).expect_err("should fail");
        assert!(matches!(err, ProviderError::ApiError(m) if m == "unknown property"));
    }

    #[test]
    fn ok_envelope_passes() {
        let body = serde_json::json!({"status": "ok", "daily": []});
        assert!(check_api_error(&body).is_ok());
    }

    #[test]
    fn missing_status_field_is_tolerated() {
        let body = serde_json::json!({"daily": []});
        assert!(check_api_error(&body).is_ok());
    }
}

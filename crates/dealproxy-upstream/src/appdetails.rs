//! HTTP client for the per-app metadata (`appdetails`) API.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::UpstreamError;
use crate::types::{AppData, AppDetailsEnvelope};

/// Client for the per-app metadata API.
///
/// One request per call and no retries; wrap calls in
/// [`crate::retry_throttled`] to back off on 429/403.
pub struct AppDetailsClient {
    client: Client,
    endpoint: Url,
    locale: String,
    region: String,
}

impl AppDetailsClient {
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`UpstreamError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        timeout_ms: u64,
        user_agent: &str,
        locale: &str,
        region: &str,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let endpoint = Url::parse(&format!("{}/appdetails", base_url.trim_end_matches('/')))
            .map_err(|e| UpstreamError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            locale: locale.to_owned(),
            region: region.to_owned(),
        })
    }

    /// Fetches metadata for one app.
    ///
    /// Returns `Ok(None)` when the upstream answers but has nothing for this
    /// app (`success: false`, no `data`, or the app id missing from the
    /// response).
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Throttled`] on HTTP 429 / 403.
    /// - [`UpstreamError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`UpstreamError::Http`] on network failure or timeout.
    /// - [`UpstreamError::Deserialize`] if the body or the `data` object has
    ///   an unexpected shape.
    pub async fn fetch(&self, app_id: &str) -> Result<Option<AppData>, UpstreamError> {
        let url = self.url_for(app_id);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status(status, url.as_str()));
        }

        let body = response.text().await?;
        let mut envelope: std::collections::HashMap<String, AppDetailsEnvelope> =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
                context: format!("appdetails({app_id})"),
                source: e,
            })?;

        let Some(entry) = envelope.remove(app_id) else {
            return Ok(None);
        };
        if !entry.success {
            return Ok(None);
        }
        let Some(data) = entry.data else {
            return Ok(None);
        };

        serde_json::from_value::<AppData>(data)
            .map(Some)
            .map_err(|e| UpstreamError::Deserialize {
                context: format!("appdetails({app_id}).data"),
                source: e,
            })
    }

    fn url_for(&self, app_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("appids", app_id)
            .append_pair("l", &self.locale)
            .append_pair("cc", &self.region);
        url
    }
}

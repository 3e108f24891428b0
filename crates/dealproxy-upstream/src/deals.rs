//! HTTP client for the deal-listing API (`/stores` and `/deals`).
//!
//! Failures are returned as-is; this client never retries. Callers decide
//! whether a failed page aborts their work.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;
use crate::types::{RawDeal, RawStore};

/// Client for the deal-listing API.
///
/// Use [`DealsClient::new`] with the configured base URL (production or a
/// wiremock server in tests).
pub struct DealsClient {
    client: Client,
    base_url: Url,
}

impl DealsClient {
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`UpstreamError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends rather than replaces
        // the last path segment (`/api/1.0/` + `deals`).
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| UpstreamError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    /// Fetches the full store list. The endpoint is not paginated.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Http`] on network failure.
    /// - [`UpstreamError::Throttled`] / [`UpstreamError::UnexpectedStatus`] on non-2xx.
    /// - [`UpstreamError::Deserialize`] if the body is not a store array.
    pub async fn fetch_stores(&self) -> Result<Vec<RawStore>, UpstreamError> {
        let url = self.endpoint("stores", &[])?;
        self.request_json(url, "store list").await
    }

    /// Fetches one page of deals for `currency`, restricted to `store_ids`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_stores`].
    pub async fn fetch_deals_page(
        &self,
        currency: &str,
        store_ids: &[&str],
        page_number: u32,
        page_size: u32,
    ) -> Result<Vec<RawDeal>, UpstreamError> {
        let url = self.deals_url(currency, store_ids, page_number, page_size)?;
        self.request_json(url, &format!("deals page {page_number} ({currency})"))
            .await
    }

    fn deals_url(
        &self,
        currency: &str,
        store_ids: &[&str],
        page_number: u32,
        page_size: u32,
    ) -> Result<Url, UpstreamError> {
        let store_param = store_ids.join(",");
        self.endpoint(
            "deals",
            &[
                ("pageSize", &page_size.to_string()),
                ("pageNumber", &page_number.to_string()),
                ("currencyCode", &currency.to_uppercase()),
                ("storeID", &store_param),
            ],
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, UpstreamError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| UpstreamError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, UpstreamError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status(status, url.as_str()));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> DealsClient {
        DealsClient::new(base_url, 5, "dealproxy-test/0.1").expect("client construction")
    }

    #[test]
    fn deals_url_keeps_base_path() {
        let client = test_client("https://deals.example.com/api/1.0");
        let url = client.deals_url("usd", &["1", "7"], 2, 60).unwrap();
        assert_eq!(
            url.as_str(),
            "https://deals.example.com/api/1.0/deals?pageSize=60&pageNumber=2&currencyCode=USD&storeID=1%2C7"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let client = test_client("https://deals.example.com/api/1.0/");
        let url = client.endpoint("stores", &[]).unwrap();
        assert_eq!(url.as_str(), "https://deals.example.com/api/1.0/stores");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = DealsClient::new("not a url", 5, "ua");
        assert!(matches!(result, Err(UpstreamError::InvalidBaseUrl { .. })));
    }
}

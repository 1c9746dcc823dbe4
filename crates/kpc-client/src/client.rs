//! Typed access to the price backend's product and comparison endpoints.

use std::time::Duration;

use kpc_core::{AppConfig, CompareOut, Product};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::retry::retry_with_backoff;

/// Client for the price backend.
///
/// Holds one pooled `reqwest::Client`; cheap to share by reference across
/// concurrent fetches. Transient failures (429, network errors, 5xx) are
/// retried with jittered exponential back-off.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ApiClient {
    /// # Errors
    ///
    /// - [`ClientError::InvalidBaseUrl`] if `base_url` does not parse.
    /// - [`ClientError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash, so `Url::join` appends to the base
        // path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Builds a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.api_base_url,
            config.http_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    /// `GET products`: every product the backend knows.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] after retries are exhausted.
    pub async fn list_products(&self) -> Result<Vec<Product>, ClientError> {
        let url = self.build_url("products", &[])?;
        self.get_json(url, "products").await
    }

    /// `GET products?query=`. A blank query lists every product.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] after retries are exhausted.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_products().await;
        }
        let url = self.build_url("products", &[("query", query)])?;
        self.get_json(url, &format!("products(query={query})"))
            .await
    }

    /// `GET products/popular?limit=`: the most frequently priced products.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] after retries are exhausted.
    pub async fn popular_products(&self, limit: u32) -> Result<Vec<Product>, ClientError> {
        let limit = limit.to_string();
        let url = self.build_url("products/popular", &[("limit", &limit)])?;
        self.get_json(url, &format!("products/popular(limit={limit})"))
            .await
    }

    /// `GET compare?product_id=`: the product and its raw offer records.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] for an unknown product id.
    /// - Any other [`ClientError`] after retries are exhausted.
    pub async fn compare(&self, product_id: i64) -> Result<CompareOut, ClientError> {
        let id = product_id.to_string();
        let url = self.build_url("compare", &[("product_id", &id)])?;
        self.get_json(url, &format!("compare(product_id={product_id})"))
            .await
    }

    /// Joins `path` onto the base URL and appends percent-encoded query
    /// parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: format!("cannot join '{path}': {e}"),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends a GET with retry and maps non-2xx statuses to typed errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, ClientError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                tracing::debug!(url = %url, "backend request");
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .unwrap_or(1);
                    return Err(ClientError::RateLimited {
                        url: url.to_string(),
                        retry_after_secs,
                    });
                }

                if status == StatusCode::NOT_FOUND {
                    return Err(ClientError::NotFound {
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(ClientError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| ClientError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

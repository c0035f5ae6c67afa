//! REST client for slow-moving reference data
//!
//! Read-only endpoints polled next to the live feed:
//! `GET {base}/rankings?limit=N`, `GET {base}/matches/finished?limit=N`
//! and `GET {base}/sponsors`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::SponsorSet;

#[derive(Error, Debug)]
pub enum ReferenceApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

pub type Result<T> = std::result::Result<T, ReferenceApiError>;

/// Source of reference data. The poller only talks to this trait.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Top `limit` ranking rows
    async fn rankings(&self, limit: u32) -> Result<Vec<Value>>;

    /// Most recent `limit` finished matches
    async fn recent_results(&self, limit: u32) -> Result<Vec<Value>>;

    /// Every sponsor slot with its entries
    async fn sponsors(&self) -> Result<Vec<SponsorSet>>;
}

/// `reqwest`-backed [`ReferenceSource`]
pub struct RestReferenceClient {
    base_url: String,
    client: Client,
}

impl RestReferenceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} with {} params", url, query.len());

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if status == 429 {
            warn!("Rate limit exceeded on {}", path);
            return Err(ReferenceApiError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ReferenceApiError::ApiError(format!(
                "GET {} failed ({}): {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ReferenceApiError::DeserializeFailed(e.to_string()))
    }
}

#[async_trait]
impl ReferenceSource for RestReferenceClient {
    async fn rankings(&self, limit: u32) -> Result<Vec<Value>> {
        self.get_json("/rankings", &[("limit", limit.to_string())]).await
    }

    async fn recent_results(&self, limit: u32) -> Result<Vec<Value>> {
        self.get_json("/matches/finished", &[("limit", limit.to_string())])
            .await
    }

    async fn sponsors(&self) -> Result<Vec<SponsorSet>> {
        self.get_json("/sponsors", &[]).await
    }
}

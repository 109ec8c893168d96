//! Backend Fetcher
//!
//! The seam between the agent and the PeerConnect REST API. The preloader and
//! the sync manager only see [`DataFetcher`]; [`HttpFetcher`] is the reqwest
//! implementation used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::trace;

use crate::error::{Result, SyncError};

// == Data Fetcher ==
/// Fetches a JSON document for a backend endpoint path.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<Value>;
}

// == HTTP Fetcher ==
/// reqwest-backed fetcher with a fixed timeout and optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    token: Option<String>,
    client_id: Option<String>,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client_id: None,
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let fetcher = Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout),
        )?;
        Ok(match &config.api_token {
            Some(token) => fetcher.with_token(token.clone()),
            None => fetcher,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sends `x-client-id` with every request.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

#[async_trait]
impl DataFetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        let url = self.url_for(endpoint);
        trace!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(client_id) = &self.client_id {
            request = request.header("x-client-id", client_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

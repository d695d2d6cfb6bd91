use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use super::messages::{ChatRequest, HistoryEntry, HistoryRecord, PageSummary};
use crate::config::BackendConfig;

/// Message used when a failed response has an empty body
const EMPTY_FAILURE_MESSAGE: &str = "Request failed";

/// Failure of a backend call
///
/// `Remote` keeps the server's body verbatim so callers can match on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Unreachable(String),

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),
}

/// Summarize and chat inference
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn summarize(&self, url: &str) -> Result<PageSummary, TransportError>;

    /// Returns the raw response body
    async fn chat_query(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

/// Query-history persistence
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn store(&self, record: &HistoryRecord) -> Result<(), TransportError>;

    async fn fetch(&self, user_id: &str) -> Result<Vec<HistoryEntry>, TransportError>;
}

/// HTTP client for the summarizer backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!("Backend client targeting {}", base_url);

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{}", self.base_url, name)
    }

    /// Send and turn non-2xx into `Remote` using the body as the message
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            EMPTY_FAILURE_MESSAGE.to_string()
        } else {
            body
        };

        debug!("Backend returned {}: {}", status, message);
        Err(TransportError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl QueryService for BackendClient {
    async fn summarize(&self, url: &str) -> Result<PageSummary, TransportError> {
        let response = self
            .send(self.client.get(self.endpoint("summarize")).query(&[("url", url)]))
            .await?;

        response
            .json::<PageSummary>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    async fn chat_query(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let response = self
            .send(self.client.post(self.endpoint("chat")).json(request))
            .await?;

        response
            .text()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))
    }
}

#[async_trait]
impl HistoryStore for BackendClient {
    async fn store(&self, record: &HistoryRecord) -> Result<(), TransportError> {
        self.send(self.client.post(self.endpoint("store-query")).json(record))
            .await?;
        Ok(())
    }

    async fn fetch(&self, user_id: &str) -> Result<Vec<HistoryEntry>, TransportError> {
        let response = self
            .send(
                self.client
                    .get(self.endpoint("retrieve-query-history"))
                    .query(&[("userId", user_id)]),
            )
            .await?;

        response
            .json::<Vec<HistoryEntry>>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

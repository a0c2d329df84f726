// reqwest-backed fetch gateway
use crate::application::fetch_gateway::FetchGateway;
use crate::domain::source::{FetchOutcome, FetchRequest};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP error! Status: {0}")]
    HttpStatus(StatusCode),
    #[error("invalid JSON in response: {0}")]
    Parse(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct HttpFetchGateway {
    client: reqwest::Client,
}

impl HttpFetchGateway {
    /// No timeout unless one is configured; a hung request just never resolves.
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn try_fetch(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        let body = response.text().await.map_err(FetchError::Network)?;
        serde_json::from_str(&body).map_err(FetchError::Parse)
    }
}

#[async_trait]
impl FetchGateway for HttpFetchGateway {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        match self.try_fetch(&request.url).await {
            Ok(payload) => {
                tracing::debug!(source = %request.source, url = %request.url, "fetch succeeded");
                FetchOutcome::Success { payload }
            }
            Err(e) => {
                tracing::debug!(source = %request.source, url = %request.url, error = %e, "fetch failed");
                FetchOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        }
    }
}

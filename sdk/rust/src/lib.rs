//! Client for the probe report endpoint.
//!
//! The acceptance harness asserts on a probe process by fetching `GET /` and
//! inspecting the body. [`ReportClient`] wraps that one call.

use std::time::Duration;

use reqwest::Client;

/// Errors talking to a report endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("report endpoint at {url} not ready after {waited:?}")]
    NotReady { url: String, waited: Duration },
}

/// Status and body of one report fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResponse {
    pub status: u16,
    pub body: String,
}

impl ReportResponse {
    /// 2xx with a non-empty body.
    pub fn is_pass(&self) -> bool {
        (200..300).contains(&self.status) && !self.body.is_empty()
    }
}

pub struct ReportClient {
    client: Client,
    base_url: String,
}

impl ReportClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the report.
    pub async fn fetch(&self) -> Result<ReportResponse, ClientError> {
        let url = format!("{}/", self.base_url);
        let request_error = |source| ClientError::Request {
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(request_error)?;
        Ok(ReportResponse { status, body })
    }

    /// Poll until the endpoint answers at all, or `timeout` elapses.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<ReportResponse, ClientError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.fetch().await {
                Ok(response) => return Ok(response),
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Err(_) => {
                    return Err(ClientError::NotReady {
                        url: self.base_url.clone(),
                        waited: timeout,
                    })
                }
            }
        }
    }
}

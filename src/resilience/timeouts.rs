//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap each connect and query suspension point in a deadline
//! - Translate elapsed deadlines into `ProbeError::Timeout`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from driver errors
//! - A zero limit is rejected by config validation, never reaches here

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::TimeoutConfig;
use crate::probe::{ProbeError, Step};

/// Per-step deadlines handed to every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimeouts {
    pub connect: Duration,
    pub query: Duration,
}

impl StepTimeouts {
    pub fn new(connect: Duration, query: Duration) -> Self {
        Self { connect, query }
    }

    /// Run a connect step. Driver errors map to `ProbeError::Connection`.
    pub async fn connect<T, E, F>(&self, tag: &str, fut: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<crate::probe::BoxError>,
    {
        bounded(tag, Step::Connect, self.connect, fut)
            .await?
            .map_err(|e| ProbeError::connection(tag, e))
    }

    /// Run a query step. Driver errors map to `ProbeError::Query`.
    pub async fn query<T, E, F>(&self, tag: &str, query: &str, fut: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<crate::probe::BoxError>,
    {
        bounded(tag, Step::Query, self.query, fut)
            .await?
            .map_err(|e| ProbeError::query(tag, query, e))
    }
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for StepTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            query: Duration::from_secs(config.query_secs),
        }
    }
}

/// Await `fut` for at most `limit`.
pub async fn bounded<F: Future>(
    tag: &str,
    step: Step,
    limit: Duration,
    fut: F,
) -> Result<F::Output, ProbeError> {
    match timeout(limit, fut).await {
        Ok(output) => Ok(output),
        Err(_) => {
            tracing::warn!(tag = %tag, step = %step, limit_ms = limit.as_millis() as u64, "Probe step timed out");
            Err(ProbeError::Timeout {
                tag: tag.to_string(),
                step,
                limit,
            })
        }
    }
}

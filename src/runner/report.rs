//! Probe outcomes and the aggregated report.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::probe::ProbeError;

/// Result of one attempted probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub tag: String,
    pub backend: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `ProbeError::kind()` of a failed probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub elapsed_ms: u64,
}

impl ProbeOutcome {
    pub fn success(tag: &str, backend: &'static str, content: String, elapsed: Duration) -> Self {
        Self {
            tag: tag.to_string(),
            backend,
            success: true,
            content: Some(content),
            error: None,
            kind: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failure(tag: &str, backend: &'static str, err: &ProbeError, elapsed: Duration) -> Self {
        Self {
            tag: tag.to_string(),
            backend,
            success: false,
            content: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Everything one run produced. Built once, read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    run_id: Uuid,
    passed: bool,
    outcomes: Vec<ProbeOutcome>,
    skipped: Vec<String>,
}

impl Report {
    /// `outcomes` and `skipped` are in spec order.
    pub fn new(outcomes: Vec<ProbeOutcome>, skipped: Vec<String>) -> Self {
        let passed = outcomes.iter().all(|o| o.success);
        Self {
            run_id: Uuid::new_v4(),
            passed,
            outcomes,
            skipped,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// True when every attempted probe succeeded.
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    /// Tags that abstained for lack of a binding.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Successful artifacts concatenated in spec order. Failed probes contribute nothing.
    pub fn content(&self) -> String {
        self.outcomes
            .iter()
            .filter_map(|o| o.content.as_deref())
            .collect()
    }
}

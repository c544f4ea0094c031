//! Probe runner subsystem.
//!
//! # Data Flow
//! ```text
//! [ProbeSpec] (report order)
//!     → per spec, all launched together on one task:
//!         CredentialSource::find(tag)
//!             empty  → abstain (no outcome)
//!             bundle → BackendProbe::verify → ProbeOutcome
//!     → join: wait for every spec to settle
//!     → no bundle found anywhere → RunError::Configuration
//!     → otherwise Report (outcomes in spec order)
//! ```
//!
//! # Design Decisions
//! - Probes are multiplexed cooperatively, not spawned onto threads
//! - A failed probe never short-circuits its siblings
//! - Probe errors are converted to outcomes here and never propagate further
//! - Every operation is attempted exactly once

pub mod report;

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use thiserror::Error;

use crate::credentials::CredentialSource;
use crate::observability::metrics;
use crate::probe::ProbeSpec;

pub use report::{ProbeOutcome, Report};

/// Failure of the run as a whole, as opposed to any single probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("No services with tags matching any of: [{}]", tags.join(", "))]
    Configuration { tags: Vec<String> },
}

/// Resolves credentials for each spec and runs the eligible probes.
pub struct ProbeRunner {
    source: Arc<dyn CredentialSource>,
}

impl ProbeRunner {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self { source }
    }

    /// Run every spec concurrently and collect the outcomes in spec order.
    pub async fn run(&self, specs: &[ProbeSpec]) -> Result<Report, RunError> {
        let settled = join_all(specs.iter().map(|spec| self.attempt(spec))).await;

        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();
        for (spec, outcome) in specs.iter().zip(settled) {
            match outcome {
                Some(outcome) => outcomes.push(outcome),
                None => skipped.push(spec.tag.clone()),
            }
        }

        if outcomes.is_empty() {
            let err = RunError::Configuration {
                tags: specs.iter().map(|s| s.tag.clone()).collect(),
            };
            tracing::error!("{}", err);
            return Err(err);
        }

        let report = Report::new(outcomes, skipped);
        tracing::info!(
            run_id = %report.run_id(),
            attempted = report.outcomes().len(),
            skipped = report.skipped().len(),
            passed = report.passed(),
            "Probe run complete"
        );
        Ok(report)
    }

    /// `None` when the platform has no binding for the tag.
    async fn attempt(&self, spec: &ProbeSpec) -> Option<ProbeOutcome> {
        let credentials = self.source.find(&spec.tag).await;
        if credentials.is_empty() {
            tracing::info!(tag = %spec.tag, "No binding found, skipping probe");
            metrics::record_skipped(&spec.tag);
            return None;
        }

        let backend = spec.probe.backend();
        tracing::debug!(tag = %spec.tag, backend = backend, fields = ?credentials, "Running probe");

        let started = Instant::now();
        let result = spec.probe.verify(&credentials).await;
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(artifact) => {
                tracing::info!(
                    tag = %spec.tag,
                    backend = backend,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Probe succeeded"
                );
                metrics::record_probe(&spec.tag, "success", elapsed);
                ProbeOutcome::success(&spec.tag, backend, artifact.content(), elapsed)
            }
            Err(err) => {
                tracing::error!(
                    tag = %spec.tag,
                    backend = backend,
                    kind = err.kind(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "Probe failed"
                );
                metrics::record_probe(&spec.tag, err.kind(), elapsed);
                ProbeOutcome::failure(&spec.tag, backend, &err, elapsed)
            }
        };
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialBundle, InMemoryCredentials};
    use crate::probe::{Artifact, BackendProbe, ProbeError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers with a fixed fragment after a delay, or fails.
    struct Scripted {
        fragment: Option<&'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(fragment: &'static str, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                fragment: Some(fragment),
                delay: Duration::from_millis(delay_ms),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fragment: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BackendProbe for Scripted {
        fn backend(&self) -> &'static str {
            "scripted"
        }

        async fn verify(&self, _: &CredentialBundle) -> Result<Artifact, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.fragment {
                Some(fragment) => {
                    let mut artifact = Artifact::new();
                    artifact.push_raw(fragment);
                    Ok(artifact)
                }
                None => Err(ProbeError::connection("scripted", "refused")),
            }
        }
    }

    fn bound(tags: &[&str]) -> Arc<InMemoryCredentials> {
        let mut source = InMemoryCredentials::new();
        for tag in tags {
            source = source.with(*tag, CredentialBundle::from_value(json!({ "host": "h" })));
        }
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_content_follows_spec_order_not_completion_order() {
        let runner = ProbeRunner::new(bound(&["a", "b", "c"]));
        let specs = vec![
            ProbeSpec::new("a", Scripted::ok("A", 60)),
            ProbeSpec::new("b", Scripted::ok("B", 0)),
            ProbeSpec::new("c", Scripted::ok("C", 30)),
        ];
        let report = runner.run(&specs).await.unwrap();
        assert_eq!(report.content(), "ABC");
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_unbound_tag_abstains() {
        let unbound = Scripted::ok("X", 0);
        let runner = ProbeRunner::new(bound(&["a"]));
        let specs = vec![
            ProbeSpec::new("a", Scripted::ok("A", 0)),
            ProbeSpec::new("x", unbound.clone()),
        ];
        let report = runner.run(&specs).await.unwrap();
        assert_eq!(report.outcomes().len(), 1);
        assert_eq!(report.skipped(), ["x".to_string()]);
        assert_eq!(unbound.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_short_circuit() {
        let slow = Scripted::ok("B", 50);
        let runner = ProbeRunner::new(bound(&["a", "b"]));
        let specs = vec![
            ProbeSpec::new("a", Scripted::failing()),
            ProbeSpec::new("b", slow.clone()),
        ];
        let report = runner.run(&specs).await.unwrap();
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert!(!report.passed());
        assert_eq!(report.content(), "B");
        assert_eq!(report.outcomes()[0].kind, Some("connection"));
    }

    #[tokio::test]
    async fn test_nothing_bound_is_configuration_error() {
        let runner = ProbeRunner::new(Arc::new(InMemoryCredentials::new()));
        let specs = vec![
            ProbeSpec::new("redis", Scripted::ok("A", 0)),
            ProbeSpec::new("s3", Scripted::ok("B", 0)),
        ];
        let err = runner.run(&specs).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No services with tags matching any of: [redis, s3]"
        );
    }
}

//! Acceptance probes for platform-bound backing services.
//!
//! A probe process reads the service bindings the platform injects, runs a
//! connect-then-verify check against every bound backend it knows, and serves
//! the collected evidence on `GET /` for an external harness to assert on.

pub mod config;
pub mod credentials;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod resilience;
pub mod runner;

pub use config::ProbeConfig;
pub use credentials::{CredentialBundle, CredentialSource};
pub use http::ReportServer;
pub use lifecycle::Shutdown;
pub use probe::{BackendProbe, ProbeError, ProbeKind, ProbeSpec};
pub use runner::{ProbeRunner, Report, RunError};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! runner, probes, report server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (platform log drain)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`tag`, `backend`, `kind`, `elapsed_ms`) on every probe event
//! - Credential values never reach a log line or a metric label
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

//! HTTP report subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, trace, timeout)
//!     → GET / → Report::content() as text/plain
//! ```
//!
//! # Design Decisions
//! - The server starts only after the run has produced a Report
//! - Status is 200 unless `server.failure_status` opts into 503 on failure

pub mod server;

pub use server::ReportServer;

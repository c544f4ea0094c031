//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe step (connect / query):
//!     → timeouts.rs (enforce per-step deadline)
//!     → On expiry: ProbeError::Timeout, probe ends failed
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - No retries: each step is attempted exactly once

pub mod timeouts;

pub use timeouts::StepTimeouts;

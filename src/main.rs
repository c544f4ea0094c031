//! Service probe process.
//!
//! # Architecture Overview
//!
//! ```text
//!   VCAP_SERVICES ──▶ credentials ──▶ runner ──┬──▶ probe::s3 ─────────┐
//!                                              ├──▶ probe::redis ──────┤
//!                                              ├──▶ probe::mysql ──────┤  (concurrent,
//!                                              └──▶ ...                │   one task)
//!                                                                      ▼
//!   harness ◀── GET / ◀── http::ReportServer ◀── Report (spec order) ◀─┘
//! ```
//!
//! No flags. Bindings come from the platform environment, the port from `PORT`,
//! optional settings from the TOML file named by `PROBE_CONFIG`.

use service_probe::lifecycle::startup;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    startup::run().await?;
    Ok(())
}

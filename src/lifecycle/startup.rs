//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Run every configured probe once
//! - Bind the report listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when the report is final)

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_from_env, ConfigError, ProbeConfig};
use crate::credentials::{CredentialSource, CredentialsError, VcapServices};
use crate::http::ReportServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};
use crate::probe::ProbeSpec;
use crate::resilience::StepTimeouts;
use crate::runner::{ProbeRunner, Report, RunError};

/// Anything that stops the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("service bindings unreadable: {0}")]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Specs for the configured tags, in report order.
pub fn probe_specs(config: &ProbeConfig) -> Result<Vec<ProbeSpec>, ConfigError> {
    let kinds = config.probes.kinds().map_err(|e| {
        ConfigError::Validation(vec![crate::config::ValidationError::UnknownTag(e.0)])
    })?;
    Ok(ProbeSpec::for_kinds(&kinds, StepTimeouts::from(&config.timeouts)))
}

/// Run the configured probes once against `source`.
pub async fn run_probes(
    config: &ProbeConfig,
    source: Arc<dyn CredentialSource>,
) -> Result<Report, StartupError> {
    let specs = probe_specs(config)?;
    tracing::info!(
        tags = ?specs.iter().map(|s| s.tag.as_str()).collect::<Vec<_>>(),
        connect_secs = config.timeouts.connect_secs,
        query_secs = config.timeouts.query_secs,
        "Running probes"
    );
    Ok(ProbeRunner::new(source).run(&specs).await?)
}

/// Serve `report` on `listener` until `shutdown` fires.
pub async fn serve(
    report: Report,
    config: &ProbeConfig,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let server = ReportServer::new(Arc::new(report), config.server.clone());
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

/// Full process lifecycle for the `service-probe` binary.
pub async fn run() -> Result<(), StartupError> {
    let config = load_from_env()?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-probe starting");

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr)?;
        }
    }

    let source: Arc<dyn CredentialSource> =
        Arc::new(VcapServices::from_env(&config.credentials.env_var)?);
    let report = run_probes(&config, source).await?;

    let listener = TcpListener::bind(config.server.bind_address()).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    serve(report, &config, listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

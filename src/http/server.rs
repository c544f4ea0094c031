//! Report server setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the single report handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a bound listener until shutdown is broadcast

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::observability::metrics;
use crate::runner::Report;

pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// State injected into the report handler.
#[derive(Clone)]
struct ReportState {
    content: Arc<str>,
    passed: bool,
    failure_status: bool,
}

/// Serves a finished [`Report`] on `GET /`.
pub struct ReportServer {
    router: Router,
    config: ServerConfig,
}

impl ReportServer {
    /// The report is final; the server only ever reads it.
    pub fn new(report: Arc<Report>, config: ServerConfig) -> Self {
        let state = ReportState {
            content: Arc::from(report.content()),
            passed: report.passed(),
            failure_status: config.failure_status,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: ReportState) -> Router {
        Router::new()
            .route("/", get(report_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for embedding or driving with `tower::ServiceExt::oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until a value arrives on `shutdown` (or its sender is dropped).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Report server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Report server draining");
            })
            .await?;

        tracing::info!("Report server stopped");
        Ok(())
    }
}

async fn report_handler(State(state): State<ReportState>) -> Response {
    let status = if state.failure_status && !state.passed {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    metrics::record_report_request(status.as_u16());
    tracing::debug!(status = status.as_u16(), bytes = state.content.len(), "Serving report");

    (
        status,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.content.to_string(),
    )
        .into_response()
}

//! PostgreSQL probe.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DbBackend;
use url::Url;

use super::{query_via_sea_orm, targets, Connector, SeaOrmConnector};
use crate::credentials::CredentialBundle;
use crate::probe::uri::ConnectionParams;
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "postgres";
const DEFAULT_PORT: u16 = 5432;
const LIST_TABLES: &str = "SELECT * FROM pg_catalog.pg_tables \
    WHERE schemaname != 'pg_catalog' AND schemaname != 'information_schema'";

pub fn driver_url(params: &ConnectionParams) -> Result<Url, ProbeError> {
    let mut url = params
        .to_url("postgres", DEFAULT_PORT)
        .map_err(|e| ProbeError::malformed(TAG, format!("bad host `{}`: {}", params.host, e)))?;
    if params.tls {
        url.query_pairs_mut().append_pair("sslmode", "require");
    }
    Ok(url)
}

pub struct PostgresProbe {
    timeouts: StepTimeouts,
    connector: Arc<dyn Connector>,
}

impl PostgresProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self::with_connector(timeouts, Arc::new(SeaOrmConnector))
    }

    pub fn with_connector(timeouts: StepTimeouts, connector: Arc<dyn Connector>) -> Self {
        Self { timeouts, connector }
    }
}

#[async_trait]
impl BackendProbe for PostgresProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::Postgres.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let mut artifact = Artifact::new();
        for target in targets(TAG, credentials)? {
            tracing::debug!(via = target.label, params = ?target.params, "Probing postgres target");
            let url = driver_url(&target.params)?;
            let fragments = query_via_sea_orm(
                TAG,
                &self.timeouts,
                self.connector.as_ref(),
                DbBackend::Postgres,
                url.into(),
                LIST_TABLES,
            )
            .await?;
            artifact.extend(fragments);
        }
        Ok(artifact)
    }
}

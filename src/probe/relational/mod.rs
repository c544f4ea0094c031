//! Relational database probes (tags `mysql`, `postgres`, `sqlserver`).
//!
//! # Data Flow
//! ```text
//! CredentialBundle
//!     → targets(): discrete fields first, then `uri` when present
//!     → per target, in order:
//!         connect → list tables → SELECT * from album → release
//!     → fragments appended to one Artifact
//! ```
//!
//! # Design Decisions
//! - Each binding format is exercised on its own connection
//! - The first failing target ends the probe
//! - MySQL and PostgreSQL go through SeaORM; SQL Server through tiberius

pub mod mysql;
pub mod postgres;
pub mod sqlserver;

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DbBackend, DbErr, FromQueryResult, JsonValue,
    Statement,
};

use crate::credentials::CredentialBundle;
use crate::probe::uri::ConnectionParams;
use crate::probe::{Artifact, ProbeError};
use crate::resilience::StepTimeouts;

/// Reads the seed table the acceptance fixtures populate.
pub const SEED_QUERY: &str = "SELECT * from album";

/// One way of reaching the database, labelled for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub label: &'static str,
    pub params: ConnectionParams,
}

/// Discrete-field target, followed by the URI target when the binding has a `uri`.
pub fn targets(tag: &str, creds: &CredentialBundle) -> Result<Vec<Target>, ProbeError> {
    let mut targets = vec![Target {
        label: "fields",
        params: ConnectionParams::from_fields(tag, creds)?,
    }];
    if let Some(uri) = creds.str("uri").filter(|u| !u.trim().is_empty()) {
        targets.push(Target {
            label: "uri",
            params: ConnectionParams::from_uri(tag, &uri, creds.flag("use_tls"))?,
        });
    }
    Ok(targets)
}

/// Opens a SeaORM connection for a driver URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: String, connect_timeout: Duration)
        -> Result<DatabaseConnection, DbErr>;
}

/// Single-connection SeaORM pool over the sqlx drivers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeaOrmConnector;

#[async_trait]
impl Connector for SeaOrmConnector {
    async fn open(
        &self,
        url: String,
        connect_timeout: Duration,
    ) -> Result<DatabaseConnection, DbErr> {
        let mut options = ConnectOptions::new(url);
        options
            .max_connections(1)
            .connect_timeout(connect_timeout)
            .sqlx_logging(false);
        Database::connect(options).await
    }
}

/// Connect, run `list_tables` then the seed query, then close.
pub(crate) async fn query_via_sea_orm(
    tag: &str,
    timeouts: &StepTimeouts,
    connector: &dyn Connector,
    backend: DbBackend,
    url: String,
    list_tables: &str,
) -> Result<Artifact, ProbeError> {
    let db = timeouts
        .connect(tag, connector.open(url, timeouts.connect))
        .await?;

    let result = async {
        let mut artifact = Artifact::new();
        for sql in [list_tables, SEED_QUERY] {
            let rows: Vec<JsonValue> = timeouts
                .query(
                    tag,
                    sql,
                    JsonValue::find_by_statement(Statement::from_string(backend, sql)).all(&db),
                )
                .await?;
            artifact.push_json(&rows);
        }
        Ok::<_, ProbeError>(artifact)
    }
    .await;

    if let Err(e) = db.close().await {
        tracing::debug!(tag = %tag, error = %e, "Closing connection failed");
    }
    result
}

/// Hands out prepared connections in order and records the URLs asked for.
#[cfg(test)]
pub(crate) struct ScriptedConnector {
    plan: std::sync::Mutex<std::collections::VecDeque<Result<DatabaseConnection, DbErr>>>,
    pub urls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedConnector {
    pub fn new(plan: Vec<Result<DatabaseConnection, DbErr>>) -> Self {
        Self {
            plan: std::sync::Mutex::new(plan.into()),
            urls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock session answering the table listing, then the seed query.
    pub fn session(backend: DbBackend, table: &str, title: &str) -> DatabaseConnection {
        use sea_orm::{MockDatabase, Value};
        use std::collections::BTreeMap;

        let tables = vec![BTreeMap::from([("table_name", Value::from(table))])];
        let albums = vec![BTreeMap::from([
            ("id", Value::from(1i32)),
            ("title", Value::from(title)),
        ])];
        MockDatabase::new(backend)
            .append_query_results([tables, albums])
            .into_connection()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, url: String, _: Duration) -> Result<DatabaseConnection, DbErr> {
        self.urls.lock().unwrap().push(url);
        self.plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DbErr::Custom("no session scripted".into())))
    }
}

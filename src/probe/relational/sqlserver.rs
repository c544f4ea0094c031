//! SQL Server probe.
//!
//! Bindings carry the server address twice (`hostname` and
//! `sqlServerFullyQualifiedDomainName`) and the database twice (`name` and
//! `sqldbName`). Disagreement between the pairs is reported as malformed
//! credentials before any connection is attempted.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{targets, SEED_QUERY};
use crate::credentials::CredentialBundle;
use crate::probe::uri::ConnectionParams;
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind, Step};
use crate::resilience::timeouts::bounded;
use crate::resilience::StepTimeouts;

const TAG: &str = "sqlserver";
const DEFAULT_PORT: u16 = 1433;
const LIST_TABLES: &str = "SELECT * FROM INFORMATION_SCHEMA.TABLES";

type SqlClient = Client<Compat<TcpStream>>;

/// Both address pairs must agree.
pub fn check_consistency(creds: &CredentialBundle) -> Result<(), ProbeError> {
    if creds.str("hostname") != creds.str("sqlServerFullyQualifiedDomainName") {
        return Err(ProbeError::malformed(
            TAG,
            "badly formed credentials: hostname does not match sqlServerFullyQualifiedDomainName",
        ));
    }
    if creds.str("name") != creds.str("sqldbName") {
        return Err(ProbeError::malformed(
            TAG,
            "badly formed credentials: name does not match sqldbName",
        ));
    }
    Ok(())
}

/// The login-specific target, present when the binding carries `databaseLogin`.
pub fn login_target(creds: &CredentialBundle) -> Result<Option<ConnectionParams>, ProbeError> {
    let Some(user) = creds.str("databaseLogin").filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    Ok(Some(ConnectionParams {
        host: creds.require_str(TAG, "sqlServerFullyQualifiedDomainName")?,
        port: creds.port("port"),
        user,
        password: creds.str("databaseLoginPassword").unwrap_or_default(),
        database: creds.require_str(TAG, "sqldbName")?,
        tls: true,
    }))
}

/// TLS bindings refuse plaintext sessions; others encrypt when the server offers it.
pub fn encryption_for(params: &ConnectionParams) -> EncryptionLevel {
    if params.tls {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::On
    }
}

fn driver_config(params: &ConnectionParams) -> Config {
    let mut config = Config::new();
    config.encryption(encryption_for(params));
    config.host(&params.host);
    config.port(params.port.unwrap_or(DEFAULT_PORT));
    if !params.database.is_empty() {
        config.database(&params.database);
    }
    config.authentication(AuthMethod::sql_server(&params.user, &params.password));
    config
}

/// JSON object keyed by column name.
pub fn row_to_json(row: Row) -> Value {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut object = Map::new();
    for (name, data) in names.into_iter().zip(row) {
        object.insert(name, column_to_json(data));
    }
    Value::Object(object)
}

fn column_to_json(data: ColumnData<'static>) -> Value {
    fn or_null<T: Into<Value>>(v: Option<T>) -> Value {
        v.map(Into::into).unwrap_or(Value::Null)
    }

    match data {
        ColumnData::U8(v) => or_null(v),
        ColumnData::I16(v) => or_null(v),
        ColumnData::I32(v) => or_null(v),
        ColumnData::I64(v) => or_null(v),
        ColumnData::F32(v) => or_null(v.map(f64::from)),
        ColumnData::F64(v) => or_null(v),
        ColumnData::Bit(v) => or_null(v),
        ColumnData::String(v) => or_null(v.map(|s| s.into_owned())),
        ColumnData::Guid(v) => or_null(v.map(|g| g.to_string())),
        ColumnData::Binary(v) => or_null(v.map(|b| BASE64.encode(b))),
        other => Value::String(format!("{:?}", other)),
    }
}

/// Fields, then `uri`, then the login-specific target.
pub fn session_targets(
    creds: &CredentialBundle,
) -> Result<Vec<(&'static str, ConnectionParams)>, ProbeError> {
    let mut all: Vec<(&'static str, ConnectionParams)> = targets(TAG, creds)?
        .into_iter()
        .map(|t| (t.label, t.params))
        .collect();
    if let Some(params) = login_target(creds)? {
        all.push(("login", params));
    }
    Ok(all)
}

pub struct SqlServerProbe {
    timeouts: StepTimeouts,
}

impl SqlServerProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self { timeouts }
    }

    async fn open(&self, config: &Config) -> Result<SqlClient, tiberius::error::Error> {
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Client::connect(config.clone(), tcp.compat_write()).await
    }

    async fn connect(&self, params: &ConnectionParams) -> Result<SqlClient, ProbeError> {
        let mut config = driver_config(params);
        let first = bounded(TAG, Step::Connect, self.timeouts.connect, self.open(&config)).await?;
        match first {
            // Gateways may route the session to the node hosting the database.
            Err(tiberius::error::Error::Routing { host, port }) => {
                tracing::debug!(host = %host, port = port, "Following sqlserver redirect");
                config.host(&host);
                config.port(port);
                self.timeouts.connect(TAG, self.open(&config)).await
            }
            other => other.map_err(|e| ProbeError::connection(TAG, e)),
        }
    }

    async fn probe_target(&self, params: &ConnectionParams) -> Result<Artifact, ProbeError> {
        let mut client = self.connect(params).await?;

        let result = async {
            let mut artifact = Artifact::new();
            for sql in [LIST_TABLES, SEED_QUERY] {
                let rows = self
                    .timeouts
                    .query(TAG, sql, async {
                        client.simple_query(sql).await?.into_first_result().await
                    })
                    .await?;
                let rendered: Vec<Value> = rows.into_iter().map(row_to_json).collect();
                artifact.push_json(&rendered);
            }
            Ok::<_, ProbeError>(artifact)
        }
        .await;

        if let Err(e) = client.close().await {
            tracing::debug!(error = %e, "Closing sqlserver connection failed");
        }
        result
    }
}

#[async_trait]
impl BackendProbe for SqlServerProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::SqlServer.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        check_consistency(credentials)?;

        let mut artifact = Artifact::new();
        for (via, params) in session_targets(credentials)? {
            tracing::debug!(via = via, params = ?params, "Probing sqlserver target");
            artifact.extend(self.probe_target(&params).await?);
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding() -> Value {
        json!({
            "hostname": "music.database.example.net",
            "sqlServerFullyQualifiedDomainName": "music.database.example.net",
            "name": "musicdb",
            "sqldbName": "musicdb",
            "port": 1433,
            "username": "admin",
            "password": "pw",
            "databaseLogin": "reader",
            "databaseLoginPassword": "rpw"
        })
    }

    #[test]
    fn test_consistent_binding() {
        let creds = CredentialBundle::from_value(binding());
        assert!(check_consistency(&creds).is_ok());
    }

    #[test]
    fn test_host_mismatch_is_malformed() {
        let mut value = binding();
        value["sqlServerFullyQualifiedDomainName"] = json!("other.database.example.net");
        let err = check_consistency(&CredentialBundle::from_value(value)).unwrap_err();
        assert_eq!(err.kind(), "malformed_credentials");
        assert!(err.to_string().contains("badly formed credentials"));
    }

    #[test]
    fn test_database_mismatch_is_malformed() {
        let mut value = binding();
        value["sqldbName"] = json!("otherdb");
        assert!(check_consistency(&CredentialBundle::from_value(value)).is_err());
    }

    #[test]
    fn test_login_target() {
        let creds = CredentialBundle::from_value(binding());
        let params = login_target(&creds).unwrap().unwrap();
        assert_eq!(params.user, "reader");
        assert_eq!(params.password, "rpw");
        assert_eq!(params.database, "musicdb");

        let mut value = binding();
        value.as_object_mut().unwrap().remove("databaseLogin");
        assert!(login_target(&CredentialBundle::from_value(value)).unwrap().is_none());
    }

    #[test]
    fn test_column_rendering() {
        assert_eq!(column_to_json(ColumnData::I32(Some(7))), json!(7));
        assert_eq!(column_to_json(ColumnData::I32(None)), Value::Null);
        assert_eq!(column_to_json(ColumnData::Bit(Some(true))), json!(true));
        assert_eq!(
            column_to_json(ColumnData::String(Some("album".into()))),
            json!("album")
        );
    }

    #[test]
    fn test_session_targets_in_order() {
        let mut value = binding();
        value["uri"] = json!("sqlserver://admin:pw@music.database.example.net:1433/musicdb");
        let labels: Vec<&str> = session_targets(&CredentialBundle::from_value(value))
            .unwrap()
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert_eq!(labels, vec!["fields", "uri", "login"]);
    }

    #[test]
    fn test_tls_requires_encryption() {
        let creds = CredentialBundle::from_value(binding());
        let login = login_target(&creds).unwrap().unwrap();
        assert_eq!(encryption_for(&login), EncryptionLevel::Required);

        let plain = ConnectionParams { tls: false, ..login };
        assert_eq!(encryption_for(&plain), EncryptionLevel::On);
    }
}

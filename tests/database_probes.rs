//! Database probes against unreachable or misconfigured bindings.

use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;

use service_probe::credentials::CredentialBundle;
use service_probe::probe::cache::CacheProbe;
use service_probe::probe::document::DocumentProbe;
use service_probe::probe::relational::mysql::MySqlProbe;
use service_probe::probe::relational::postgres::PostgresProbe;
use service_probe::probe::relational::sqlserver::SqlServerProbe;
use service_probe::BackendProbe;

mod common;

#[tokio::test]
async fn test_sqlserver_mismatch_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let creds = CredentialBundle::from_value(json!({
        "hostname": "127.0.0.1",
        "sqlServerFullyQualifiedDomainName": "music.database.example.net",
        "port": port,
        "name": "musicdb",
        "sqldbName": "musicdb",
        "username": "admin",
        "password": "pw",
        "uri": format!("sqlserver://admin:pw@127.0.0.1:{}?database=musicdb", port)
    }));

    let err = SqlServerProbe::new(common::quick_timeouts())
        .verify(&creds)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_credentials");
    assert!(err.to_string().contains("badly formed credentials"));

    let accepted = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(accepted.is_err(), "probe opened a connection despite the mismatch");
}

#[tokio::test]
async fn test_sqlserver_database_mismatch_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let creds = CredentialBundle::from_value(json!({
        "hostname": "127.0.0.1",
        "sqlServerFullyQualifiedDomainName": "127.0.0.1",
        "port": port,
        "name": "musicdb",
        "sqldbName": "otherdb",
        "username": "admin"
    }));

    let err = SqlServerProbe::new(common::quick_timeouts())
        .verify(&creds)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_credentials");
    let accepted = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(accepted.is_err());
}

#[tokio::test]
async fn test_sqlserver_refused_is_connection_failure() {
    let port = common::closed_port().await;
    let creds = CredentialBundle::from_value(json!({
        "hostname": "127.0.0.1",
        "sqlServerFullyQualifiedDomainName": "127.0.0.1",
        "port": port,
        "name": "musicdb",
        "sqldbName": "musicdb",
        "username": "admin",
        "password": "pw"
    }));
    let err = SqlServerProbe::new(common::quick_timeouts())
        .verify(&creds)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "connection");
}

fn relational_bundle(port: u16) -> CredentialBundle {
    CredentialBundle::from_value(json!({
        "hostname": "127.0.0.1",
        "port": port,
        "username": "app",
        "password": "pw",
        "name": "musicdb"
    }))
}

#[tokio::test]
async fn test_mysql_refused_is_connection_failure() {
    let port = common::closed_port().await;
    let err = MySqlProbe::new(common::quick_timeouts())
        .verify(&relational_bundle(port))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "connection");
    assert!(err.to_string().starts_with("mysql:"));
    assert!(!err.to_string().contains("pw@"));
}

#[tokio::test]
async fn test_postgres_refused_is_connection_failure() {
    let port = common::closed_port().await;
    let err = PostgresProbe::new(common::quick_timeouts())
        .verify(&relational_bundle(port))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "connection");
    assert!(err.to_string().starts_with("postgres:"));
}

#[tokio::test]
async fn test_postgres_bad_uri_is_malformed() {
    let creds = CredentialBundle::from_value(json!({
        "hostname": "127.0.0.1",
        "port": 5432,
        "username": "app",
        "uri": "postgres:///musicdb"
    }));
    let err = PostgresProbe::new(common::quick_timeouts())
        .verify(&creds)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_credentials");
}

#[tokio::test]
async fn test_mongodb_unreachable_is_connection_failure() {
    let port = common::closed_port().await;
    let creds = CredentialBundle::from_value(json!({
        "uri": format!("mongodb://127.0.0.1:{}/musicdb?directConnection=true", port)
    }));
    let err = DocumentProbe::new(common::quick_timeouts())
        .verify(&creds)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "connection");
}

#[tokio::test]
async fn test_redis_keys_listed() {
    let addr = common::start_mock_redis(vec!["album:1", "album:2"]).await;
    let creds = CredentialBundle::from_value(json!({ "host": "127.0.0.1", "port": addr.port() }));
    let artifact = CacheProbe::new(common::quick_timeouts()).verify(&creds).await.unwrap();
    assert_eq!(artifact.content(), r#"["album:1","album:2"]"#);
}

#[tokio::test]
async fn test_redis_refused_is_connection_failure() {
    let port = common::closed_port().await;
    let creds = CredentialBundle::from_value(json!({ "host": "127.0.0.1", "port": port }));
    let err = CacheProbe::new(common::quick_timeouts()).verify(&creds).await.unwrap_err();
    assert_eq!(err.kind(), "connection");
}

#[test]
fn test_resp_frame_parsed_only_when_complete() {
    let frame = b"*2\r\n$4\r\nKEYS\r\n$1\r\n*\r\n";
    assert!(common::parse_command(&frame[..10]).is_none());
    let (parts, used) = common::parse_command(frame).unwrap();
    assert_eq!(parts, vec!["KEYS".to_string(), "*".to_string()]);
    assert_eq!(used, frame.len());
}

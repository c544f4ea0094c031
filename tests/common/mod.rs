//! Shared utilities for integration tests: report server harness and mock backends.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use service_probe::config::ServerConfig;
use service_probe::lifecycle::Shutdown;
use service_probe::resilience::StepTimeouts;
use service_probe::{Report, ReportServer};

pub const TEST_RSA_PEM: &str = include_str!("../fixtures/test_rsa.pem");

/// Short deadlines so unreachable backends fail fast.
pub fn quick_timeouts() -> StepTimeouts {
    StepTimeouts::new(Duration::from_secs(2), Duration::from_secs(2))
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Serve `report` on an ephemeral port. Trigger the returned `Shutdown` to stop it.
pub async fn spawn_report_server(report: Report, config: ServerConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = ReportServer::new(Arc::new(report), config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

/// Serve an axum router on an ephemeral port, standing in for a cloud REST API.
pub async fn start_mock_api(router: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Base64 service-account key JSON pointing its token exchange at `token_uri`.
pub fn service_account_key(token_uri: &str) -> String {
    let key = json!({
        "type": "service_account",
        "project_id": "acceptance",
        "client_email": "probe@acceptance.iam.gserviceaccount.com",
        "private_key": TEST_RSA_PEM,
        "token_uri": token_uri,
    });
    BASE64.encode(key.to_string())
}

/// Minimal RESP server. `KEYS` answers with `keys`; every other command gets `+OK`.
pub async fn start_mock_redis(keys: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let keys = Arc::new(keys);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let keys = keys.clone();
                    tokio::spawn(async move {
                        let _ = serve_resp(socket, &keys).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

async fn serve_resp(mut socket: TcpStream, keys: &[&str]) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        while let Some((command, used)) = parse_command(&buf) {
            buf.drain(..used);
            let reply = if command.first().map(|c| c.eq_ignore_ascii_case("KEYS")) == Some(true) {
                let mut out = format!("*{}\r\n", keys.len());
                for key in keys {
                    out.push_str(&format!("${}\r\n{}\r\n", key.len(), key));
                }
                out
            } else {
                "+OK\r\n".to_string()
            };
            socket.write_all(reply.as_bytes()).await?;
        }

        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// One complete `*N` array of bulk strings, and the bytes it spans.
pub fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    fn line(buf: &[u8], from: usize) -> Option<(&str, usize)> {
        let end = buf[from..].windows(2).position(|w| w == b"\r\n")? + from;
        Some((std::str::from_utf8(&buf[from..end]).ok()?, end + 2))
    }

    let (header, mut pos) = line(buf, 0)?;
    let count: usize = header.strip_prefix('*')?.parse().ok()?;
    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let (len_line, next) = line(buf, pos)?;
        let len: usize = len_line.strip_prefix('$')?.parse().ok()?;
        if buf.len() < next + len + 2 {
            return None;
        }
        parts.push(String::from_utf8_lossy(&buf[next..next + len]).into_owned());
        pos = next + len + 2;
    }
    Some((parts, pos))
}

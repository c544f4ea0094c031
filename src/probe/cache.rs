//! Cache probe (tag `redis`): list the key-space; an empty key-space fails.

use async_trait::async_trait;
use url::Url;

use crate::credentials::CredentialBundle;
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "redis";
const DEFAULT_PORT: u16 = 6379;

/// Connection URL for the binding. A `tls_port` selects `rediss://` on that port.
pub fn connection_url(creds: &CredentialBundle) -> Result<Url, ProbeError> {
    let host = creds.require_str(TAG, "host")?;
    let (scheme, port) = match creds.port("tls_port") {
        Some(tls_port) => ("rediss", tls_port),
        None => ("redis", creds.port("port").unwrap_or(DEFAULT_PORT)),
    };

    let mut url = Url::parse(&format!("{}://{}:{}", scheme, host, port))
        .map_err(|e| ProbeError::malformed(TAG, format!("bad host `{}`: {}", host, e)))?;
    if let Some(password) = creds.str("password").filter(|p| !p.is_empty()) {
        url.set_password(Some(&password))
            .map_err(|_| ProbeError::malformed(TAG, "password cannot be set on url"))?;
    }
    Ok(url)
}

/// Evidence from the key listing. No keys means the seed data is missing.
pub fn keys_artifact(mut keys: Vec<String>) -> Result<Artifact, ProbeError> {
    if keys.is_empty() {
        return Err(ProbeError::empty(TAG, "key-space"));
    }
    keys.sort();
    let mut artifact = Artifact::new();
    artifact.push_json(&keys);
    Ok(artifact)
}

pub struct CacheProbe {
    timeouts: StepTimeouts,
}

impl CacheProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self { timeouts }
    }
}

#[async_trait]
impl BackendProbe for CacheProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::Redis.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let url = connection_url(credentials)?;
        tracing::debug!(
            scheme = %url.scheme(),
            host = ?url.host_str(),
            port = ?url.port(),
            "Connecting to cache"
        );

        let client = redis::Client::open(url.as_str()).map_err(|e| ProbeError::connection(TAG, e))?;
        let mut con = self
            .timeouts
            .connect(TAG, client.get_multiplexed_async_connection())
            .await?;

        let mut cmd = redis::cmd("KEYS");
        cmd.arg("*");
        let keys: Vec<String> = self
            .timeouts
            .query(TAG, "KEYS *", cmd.query_async(&mut con))
            .await?;

        keys_artifact(keys)
    }
}

//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::probe::{ProbeKind, UnknownTag};

/// Root configuration for the probe service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Report listener settings.
    pub server: ServerConfig,

    /// Per-step probe deadlines.
    pub timeouts: TimeoutConfig,

    /// Which backends to probe.
    pub probes: ProbesConfig,

    /// Where service bindings come from.
    pub credentials: CredentialsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Report listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_host: String,

    /// Listening port; the `PORT` environment variable overrides it.
    pub port: u16,

    /// Upper bound on serving one report request.
    pub request_timeout_secs: u64,

    /// Answer 503 instead of 200 when any attempted probe failed.
    pub failure_status: bool,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 10,
            failure_status: false,
        }
    }
}

/// Timeout configuration for probe steps.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Single query or API call timeout in seconds.
    pub query_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            query_secs: 30,
        }
    }
}

/// Probe selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProbesConfig {
    /// Tags to probe, in report order. Empty selects every known kind.
    pub tags: Vec<String>,
}

impl ProbesConfig {
    /// Kinds to probe, in report order.
    pub fn kinds(&self) -> Result<Vec<ProbeKind>, UnknownTag> {
        if self.tags.is_empty() {
            return Ok(ProbeKind::ALL.to_vec());
        }
        self.tags.iter().map(|tag| tag.parse()).collect()
    }
}

/// Credential source configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variable holding the service-binding document.
    pub env_var: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: "VCAP_SERVICES".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

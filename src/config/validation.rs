//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port valid)
//! - Reject unknown and duplicate probe tags
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProbeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProbeConfig;
use crate::probe::ProbeKind;

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.port must not be 0")]
    ZeroPort,

    #[error("{field} must be greater than 0")]
    ZeroTimeout { field: &'static str },

    #[error("unknown probe tag `{0}`")]
    UnknownTag(String),

    #[error("probe tag `{0}` listed more than once")]
    DuplicateTag(String),

    #[error("credentials.env_var must not be empty")]
    EmptyEnvVar,

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),

    #[error("environment variable {var} has invalid value `{value}`")]
    InvalidOverride { var: &'static str, value: String },
}

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &ProbeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "server.request_timeout_secs",
        });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.connect_secs",
        });
    }
    if config.timeouts.query_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.query_secs",
        });
    }

    let mut seen = HashSet::new();
    for tag in &config.probes.tags {
        match tag.parse::<ProbeKind>() {
            Ok(kind) => {
                if !seen.insert(kind) {
                    errors.push(ValidationError::DuplicateTag(kind.tag().to_string()));
                }
            }
            Err(_) => errors.push(ValidationError::UnknownTag(tag.clone())),
        }
    }

    if config.credentials.env_var.trim().is_empty() {
        errors.push(ValidationError::EmptyEnvVar);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

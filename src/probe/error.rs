//! Probe failure taxonomy.
//!
//! SECURITY: messages carry field names and driver errors, never credential values.

use std::time::Duration;
use thiserror::Error;

/// Boxed driver error carried as the cause of a probe failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors a single backend probe can end with.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport or authentication failure reaching the backend.
    #[error("{tag}: connection failed: {source}")]
    Connection {
        tag: String,
        #[source]
        source: BoxError,
    },

    /// Connected, but the seed data the probe expects is absent.
    #[error("{tag}: {what} is empty")]
    EmptyResult { tag: String, what: String },

    /// The credential bundle is missing a field or is internally inconsistent.
    #[error("{tag}: malformed credentials: {reason}")]
    MalformedCredentials { tag: String, reason: String },

    /// A read query failed after the connection was established.
    #[error("{tag}: query `{query}` failed: {source}")]
    Query {
        tag: String,
        query: String,
        #[source]
        source: BoxError,
    },

    /// A connect or query step did not settle within its deadline.
    #[error("{tag}: {step} timed out after {limit:?}")]
    Timeout {
        tag: String,
        step: Step,
        limit: Duration,
    },
}

/// Suspension point a timeout was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    Query,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Connect => write!(f, "connect"),
            Step::Query => write!(f, "query"),
        }
    }
}

impl ProbeError {
    pub fn connection(tag: &str, source: impl Into<BoxError>) -> Self {
        ProbeError::Connection {
            tag: tag.to_string(),
            source: source.into(),
        }
    }

    pub fn empty(tag: &str, what: impl Into<String>) -> Self {
        ProbeError::EmptyResult {
            tag: tag.to_string(),
            what: what.into(),
        }
    }

    pub fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        ProbeError::MalformedCredentials {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }

    pub fn query(tag: &str, query: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ProbeError::Query {
            tag: tag.to_string(),
            query: query.into(),
            source: source.into(),
        }
    }

    /// Tag of the probe that failed.
    pub fn tag(&self) -> &str {
        match self {
            ProbeError::Connection { tag, .. }
            | ProbeError::EmptyResult { tag, .. }
            | ProbeError::MalformedCredentials { tag, .. }
            | ProbeError::Query { tag, .. }
            | ProbeError::Timeout { tag, .. } => tag,
        }
    }

    /// Stable classification used in logs, metrics and outcome JSON.
    ///
    /// A connect step that timed out counts as a connection failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Connection { .. } => "connection",
            ProbeError::Timeout { step: Step::Connect, .. } => "connection",
            ProbeError::Timeout { step: Step::Query, .. } => "timeout",
            ProbeError::EmptyResult { .. } => "empty_result",
            ProbeError::MalformedCredentials { .. } => "malformed_credentials",
            ProbeError::Query { .. } => "query",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(ProbeError::connection("redis", io).kind(), "connection");
        assert_eq!(ProbeError::empty("redis", "key-space").kind(), "empty_result");
        assert_eq!(ProbeError::malformed("sqlserver", "x").kind(), "malformed_credentials");

        let connect = ProbeError::Timeout {
            tag: "mysql".into(),
            step: Step::Connect,
            limit: Duration::from_secs(1),
        };
        assert_eq!(connect.kind(), "connection");
        let query = ProbeError::Timeout {
            tag: "mysql".into(),
            step: Step::Query,
            limit: Duration::from_secs(1),
        };
        assert_eq!(query.kind(), "timeout");
    }

    #[test]
    fn test_message_names_tag_and_cause() {
        let err = ProbeError::empty("mongodb", "collection musicdb.album");
        assert_eq!(err.to_string(), "mongodb: collection musicdb.album is empty");
        assert_eq!(err.tag(), "mongodb");
    }
}

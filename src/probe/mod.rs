//! Backend probe subsystem.
//!
//! # Data Flow
//! ```text
//! CredentialBundle
//!     → BackendProbe::verify (one variant per backend kind)
//!         → derive connection config (discrete fields, then URI)
//!         → connect (bounded by StepTimeouts)
//!         → one or two read queries, each appended to the Artifact
//!         → release connection
//!     → Artifact | ProbeError
//! ```
//!
//! # Design Decisions
//! - Probes receive everything as arguments; no shared client handles
//! - Probes are selected by tag through `ProbeKind`, not by ad hoc functions
//! - First failing step ends the probe; nothing is retried

pub mod artifact;
pub mod blob_storage;
pub mod cache;
pub mod cosmos;
pub mod document;
pub mod error;
pub mod google_auth;
pub mod job_controller;
pub mod object_storage;
pub mod relational;
pub mod signing;
pub mod trace_collector;
pub mod uri;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::credentials::CredentialBundle;
use crate::resilience::StepTimeouts;

pub use artifact::Artifact;
pub use error::{BoxError, ProbeError, Step};

/// Connect-then-verify check against one backing service.
#[async_trait]
pub trait BackendProbe: Send + Sync {
    /// Short backend name used in logs (e.g. "redis").
    fn backend(&self) -> &'static str;

    /// Run the probe sequence and return the evidence it collected.
    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError>;
}

/// Every backend kind this crate can probe, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    S3,
    Storage,
    CosmosDb,
    Dataproc,
    Tracing,
    MySql,
    Redis,
    MongoDb,
    SqlServer,
    Postgres,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 10] = [
        ProbeKind::S3,
        ProbeKind::Storage,
        ProbeKind::CosmosDb,
        ProbeKind::Dataproc,
        ProbeKind::Tracing,
        ProbeKind::MySql,
        ProbeKind::Redis,
        ProbeKind::MongoDb,
        ProbeKind::SqlServer,
        ProbeKind::Postgres,
    ];

    /// Binding tag the platform uses for this backend.
    pub fn tag(&self) -> &'static str {
        match self {
            ProbeKind::S3 => "s3",
            ProbeKind::Storage => "storage",
            ProbeKind::CosmosDb => "cosmosdb",
            ProbeKind::Dataproc => "dataproc",
            ProbeKind::Tracing => "tracing",
            ProbeKind::MySql => "mysql",
            ProbeKind::Redis => "redis",
            ProbeKind::MongoDb => "mongodb",
            ProbeKind::SqlServer => "sqlserver",
            ProbeKind::Postgres => "postgres",
        }
    }

    /// Build the probe implementation for this kind.
    pub fn probe(&self, timeouts: StepTimeouts) -> Arc<dyn BackendProbe> {
        match self {
            ProbeKind::S3 => Arc::new(object_storage::ObjectStorageProbe::new(timeouts)),
            ProbeKind::Storage => Arc::new(blob_storage::BlobStorageProbe::new(timeouts)),
            ProbeKind::CosmosDb => Arc::new(cosmos::CosmosProbe::new(timeouts)),
            ProbeKind::Dataproc => Arc::new(job_controller::JobControllerProbe::new(timeouts)),
            ProbeKind::Tracing => Arc::new(trace_collector::TraceCollectorProbe::new(timeouts)),
            ProbeKind::MySql => Arc::new(relational::mysql::MySqlProbe::new(timeouts)),
            ProbeKind::Redis => Arc::new(cache::CacheProbe::new(timeouts)),
            ProbeKind::MongoDb => Arc::new(document::DocumentProbe::new(timeouts)),
            ProbeKind::SqlServer => Arc::new(relational::sqlserver::SqlServerProbe::new(timeouts)),
            ProbeKind::Postgres => Arc::new(relational::postgres::PostgresProbe::new(timeouts)),
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tag that no backend kind answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown probe tag `{}`", self.0)
    }
}

impl std::error::Error for UnknownTag {}

impl FromStr for ProbeKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ProbeKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

/// Static pairing of a selector tag with the probe that serves it.
#[derive(Clone)]
pub struct ProbeSpec {
    pub tag: String,
    pub probe: Arc<dyn BackendProbe>,
}

impl ProbeSpec {
    pub fn new(tag: impl Into<String>, probe: Arc<dyn BackendProbe>) -> Self {
        Self {
            tag: tag.into(),
            probe,
        }
    }

    /// Spec for a known backend kind under its platform tag.
    pub fn for_kind(kind: ProbeKind, timeouts: StepTimeouts) -> Self {
        Self::new(kind.tag(), kind.probe(timeouts))
    }

    /// Specs for the given kinds, in the given order.
    pub fn for_kinds(kinds: &[ProbeKind], timeouts: StepTimeouts) -> Vec<Self> {
        kinds.iter().map(|kind| Self::for_kind(*kind, timeouts)).collect()
    }
}

impl fmt::Debug for ProbeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeSpec")
            .field("tag", &self.tag)
            .field("backend", &self.probe.backend())
            .finish()
    }
}

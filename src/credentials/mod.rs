//! Service-binding credential discovery.
//!
//! # Data Flow
//! ```text
//! Platform environment (VCAP_SERVICES JSON)
//!     → vcap.rs (parse once, index instances by tag)
//!     → CredentialSource::find(tag)
//!     → CredentialBundle (empty when nothing matches)
//!     → ProbeRunner (empty bundle = abstain)
//! ```
//!
//! # Design Decisions
//! - "No match" is an empty bundle, never an error
//! - Lookups are never retried
//! - Bundles never print their values

pub mod bundle;
pub mod memory;
pub mod vcap;

use async_trait::async_trait;
use thiserror::Error;

pub use bundle::CredentialBundle;
pub use memory::InMemoryCredentials;
pub use vcap::VcapServices;

/// Locates the credential bundle bound under a selector tag.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Returns the first bundle whose binding carries `tag`, or an empty bundle.
    async fn find(&self, tag: &str) -> CredentialBundle;
}

/// Errors building a credential source from the environment.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("{var} is not valid JSON: {source}")]
    Parse {
        var: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{var} must be a JSON object keyed by service label")]
    Shape { var: String },
}

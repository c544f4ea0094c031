//! Platform-injected service bindings (`VCAP_SERVICES`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{CredentialBundle, CredentialSource, CredentialsError};

/// One bound service instance as the platform describes it.
#[derive(Clone, Deserialize)]
pub struct ServiceInstance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub credentials: Value,
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("tags", &self.tags)
            .field("credentials", &CredentialBundle::from_value(self.credentials.clone()))
            .finish()
    }
}

/// Credential source backed by the `VCAP_SERVICES` document.
#[derive(Debug, Clone, Default)]
pub struct VcapServices {
    instances: Vec<ServiceInstance>,
}

impl VcapServices {
    /// Read and parse the named environment variable.
    ///
    /// An unset or blank variable is not an error: every lookup then abstains.
    pub fn from_env(var: &str) -> Result<Self, CredentialsError> {
        match std::env::var(var) {
            Ok(raw) if !raw.trim().is_empty() => Self::parse(var, &raw),
            _ => {
                tracing::warn!(var = %var, "Service bindings variable not set");
                Ok(Self::default())
            }
        }
    }

    /// Parse a `VCAP_SERVICES` document. `var` only labels errors.
    pub fn parse(var: &str, raw: &str) -> Result<Self, CredentialsError> {
        let by_label: Map<String, Value> =
            serde_json::from_str(raw).map_err(|source| match source.classify() {
                serde_json::error::Category::Data => CredentialsError::Shape { var: var.to_string() },
                _ => CredentialsError::Parse {
                    var: var.to_string(),
                    source,
                },
            })?;

        // Document order, across labels and within each label.
        let mut instances = Vec::new();
        for (label, entries) in by_label {
            let Value::Array(entries) = entries else {
                tracing::warn!(label = %label, "Ignoring non-array service label entry");
                continue;
            };
            for entry in entries {
                match serde_json::from_value::<ServiceInstance>(entry) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => tracing::warn!(label = %label, error = %e, "Ignoring malformed service instance"),
                }
            }
        }

        Ok(Self { instances })
    }

    pub fn instances(&self) -> &[ServiceInstance] {
        &self.instances
    }

    fn lookup(&self, tag: &str) -> Option<&ServiceInstance> {
        self.instances
            .iter()
            .find(|instance| instance.tags.iter().any(|t| t == tag))
    }
}

#[async_trait]
impl CredentialSource for VcapServices {
    async fn find(&self, tag: &str) -> CredentialBundle {
        match self.lookup(tag) {
            Some(instance) => {
                tracing::debug!(
                    tag = %tag,
                    instance = %instance.name,
                    label = %instance.label,
                    "Service binding matched"
                );
                CredentialBundle::from_value(instance.credentials.clone())
            }
            None => CredentialBundle::default(),
        }
    }
}

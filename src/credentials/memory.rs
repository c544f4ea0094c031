//! In-process credential source.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{CredentialBundle, CredentialSource};

/// Tag → bundle map, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentials {
    bundles: HashMap<String, CredentialBundle>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `bundle` under `tag`, replacing any previous binding.
    pub fn with(mut self, tag: impl Into<String>, bundle: CredentialBundle) -> Self {
        self.bundles.insert(tag.into(), bundle);
        self
    }
}

#[async_trait]
impl CredentialSource for InMemoryCredentials {
    async fn find(&self, tag: &str) -> CredentialBundle {
        self.bundles.get(tag).cloned().unwrap_or_default()
    }
}

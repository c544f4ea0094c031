//! Object-store probe (tag `s3`): list every object in the bound bucket.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::{ObjectMeta, ObjectStore};
use serde::Serialize;
use std::sync::Arc;

use crate::credentials::CredentialBundle;
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "s3";
const DEFAULT_REGION: &str = "us-east-1";

/// Bucket coordinates taken from the binding.
#[derive(Clone, PartialEq, Eq)]
pub struct BucketSettings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// S3-compatible endpoint, when the binding names one.
    pub endpoint: Option<String>,
}

impl BucketSettings {
    pub fn from_credentials(creds: &CredentialBundle) -> Result<Self, ProbeError> {
        Ok(Self {
            bucket: creds.require_str(TAG, "bucket_name")?,
            region: creds.str("region_name").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id: creds.require_str(TAG, "access_key_id")?,
            secret_access_key: creds.require_str(TAG, "secret_access_key")?,
            endpoint: creds.str("endpoint"),
        })
    }
}

impl std::fmt::Debug for BucketSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketSettings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Builds the store client for a bucket.
pub type StoreFactory =
    Arc<dyn Fn(&BucketSettings) -> Result<Arc<dyn ObjectStore>, object_store::Error> + Send + Sync>;

/// One listed object.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: String,
    pub e_tag: Option<String>,
}

impl From<ObjectMeta> for ObjectEntry {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            key: meta.location.to_string(),
            size: meta.size as u64,
            last_modified: meta.last_modified.to_rfc3339(),
            e_tag: meta.e_tag,
        }
    }
}

pub struct ObjectStorageProbe {
    timeouts: StepTimeouts,
    factory: StoreFactory,
}

impl ObjectStorageProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self::with_factory(timeouts, Arc::new(amazon_s3))
    }

    /// Probe that obtains its store from `factory` instead of AWS.
    pub fn with_factory(timeouts: StepTimeouts, factory: StoreFactory) -> Self {
        Self { timeouts, factory }
    }
}

fn amazon_s3(settings: &BucketSettings) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(&settings.bucket)
        .with_region(&settings.region)
        .with_access_key_id(&settings.access_key_id)
        .with_secret_access_key(&settings.secret_access_key);
    if let Some(endpoint) = &settings.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    Ok(Arc::new(builder.build()?))
}

#[async_trait]
impl BackendProbe for ObjectStorageProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::S3.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let settings = BucketSettings::from_credentials(credentials)?;
        tracing::debug!(bucket = %settings.bucket, region = %settings.region, "Listing bucket");

        let store = (self.factory)(&settings).map_err(|e| ProbeError::connection(TAG, e))?;

        let query = format!("list objects in {}", settings.bucket);
        let objects: Vec<ObjectMeta> = self
            .timeouts
            .query(TAG, &query, store.list(None).try_collect())
            .await?;

        let entries: Vec<ObjectEntry> = objects.into_iter().map(ObjectEntry::from).collect();
        let mut artifact = Artifact::new();
        artifact.push_json(&entries);
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::PutPayload;
    use serde_json::json;

    fn creds() -> CredentialBundle {
        CredentialBundle::from_value(json!({
            "bucket_name": "b1",
            "access_key_id": "k",
            "secret_access_key": "s",
            "region_name": "us-east-1"
        }))
    }

    fn seeded_probe(store: Arc<InMemory>) -> ObjectStorageProbe {
        ObjectStorageProbe::with_factory(
            StepTimeouts::default(),
            Arc::new(move |settings: &BucketSettings| {
                assert_eq!(settings.bucket, "b1");
                Ok::<_, object_store::Error>(store.clone() as Arc<dyn ObjectStore>)
            }),
        )
    }

    #[tokio::test]
    async fn test_lists_bucket_contents() {
        let store = Arc::new(InMemory::new());
        store
            .put(&Path::from("albums/one.json"), PutPayload::from_static(b"{}"))
            .await
            .unwrap();

        let artifact = seeded_probe(store).verify(&creds()).await.unwrap();
        let listed: serde_json::Value = serde_json::from_str(&artifact.content()).unwrap();
        assert_eq!(listed[0]["key"], "albums/one.json");
        assert_eq!(listed[0]["size"], 2);
    }

    #[tokio::test]
    async fn test_empty_bucket_is_success() {
        let artifact = seeded_probe(Arc::new(InMemory::new())).verify(&creds()).await.unwrap();
        assert_eq!(artifact.content(), "[]");
    }

    #[tokio::test]
    async fn test_missing_bucket_name() {
        let creds = CredentialBundle::from_value(json!({ "access_key_id": "k" }));
        let err = seeded_probe(Arc::new(InMemory::new())).verify(&creds).await.unwrap_err();
        assert_eq!(err.kind(), "malformed_credentials");
    }

    #[test]
    fn test_settings_default_region() {
        let creds = CredentialBundle::from_value(json!({
            "bucket_name": "b1",
            "access_key_id": "k",
            "secret_access_key": "s"
        }));
        let settings = BucketSettings::from_credentials(&creds).unwrap();
        assert_eq!(settings.region, "us-east-1");
        assert!(!format!("{:?}", settings).contains("\"s\""));
    }
}

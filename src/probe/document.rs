//! Document-store probe (tag `mongodb`): read every document of the seed collection.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde_json::Value;

use crate::credentials::CredentialBundle;
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "mongodb";
pub const SEED_DATABASE: &str = "musicdb";
pub const SEED_COLLECTION: &str = "album";

/// Evidence from the collection scan. No documents means the seed data is missing.
pub fn documents_artifact(docs: Vec<Document>) -> Result<Artifact, ProbeError> {
    if docs.is_empty() {
        return Err(ProbeError::empty(
            TAG,
            format!("collection {}.{}", SEED_DATABASE, SEED_COLLECTION),
        ));
    }
    let rendered: Vec<Value> = docs
        .into_iter()
        .map(|d| serde_json::to_value(d).unwrap_or(Value::Null))
        .collect();
    let mut artifact = Artifact::new();
    artifact.push_json(&rendered);
    Ok(artifact)
}

pub struct DocumentProbe {
    timeouts: StepTimeouts,
}

impl DocumentProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self { timeouts }
    }
}

#[async_trait]
impl BackendProbe for DocumentProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::MongoDb.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let uri = credentials.require_str(TAG, "uri")?;

        let mut options = self
            .timeouts
            .connect(TAG, async { ClientOptions::parse(uri.as_str()).await })
            .await?;
        options.connect_timeout = Some(self.timeouts.connect);
        options.server_selection_timeout = Some(self.timeouts.connect);
        let client = Client::with_options(options).map_err(|e| ProbeError::connection(TAG, e))?;

        // The driver connects lazily; ping forces server selection and auth.
        let db = client.database(SEED_DATABASE);
        let result = self.scan(&db).await;
        client.shutdown().await;
        documents_artifact(result?)
    }
}

impl DocumentProbe {
    async fn scan(&self, db: &mongodb::Database) -> Result<Vec<Document>, ProbeError> {
        self.timeouts
            .connect(TAG, async { db.run_command(doc! { "ping": 1 }).await })
            .await?;

        let collection = db.collection::<Document>(SEED_COLLECTION);
        let query = format!("find {}.{}", SEED_DATABASE, SEED_COLLECTION);
        self.timeouts
            .query(TAG, &query, async {
                let cursor = collection.find(doc! {}).await?;
                cursor.try_collect::<Vec<Document>>().await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection_fails() {
        let err = documents_artifact(Vec::new()).unwrap_err();
        assert_eq!(err.kind(), "empty_result");
        assert!(err.to_string().contains("musicdb.album"));
    }

    #[test]
    fn test_documents_rendered_as_json() {
        let docs = vec![
            doc! { "title": "Nevermind", "artist": "Nirvana", "releaseYear": "1991" },
            doc! { "title": "Blue", "artist": "Joni Mitchell" },
        ];
        let artifact = documents_artifact(docs).unwrap();
        let parsed: Value = serde_json::from_str(&artifact.content()).unwrap();
        assert_eq!(parsed[0]["title"], "Nevermind");
        assert_eq!(parsed[1]["artist"], "Joni Mitchell");
    }
}

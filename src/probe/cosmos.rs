//! Document-database probe (tag `cosmosdb`): read the bound database and its containers.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::credentials::CredentialBundle;
use crate::probe::signing::{http_date, sign};
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "cosmosdb";
const API_VERSION: &str = "2018-12-31";

#[derive(Debug, Deserialize)]
struct Database {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    #[serde(rename = "DocumentCollections", default)]
    collections: Vec<Collection>,
}

#[derive(Debug, Deserialize)]
struct Collection {
    id: String,
}

/// URL-encoded master-key authorization token for one request.
pub fn master_key_token(
    key_b64: &str,
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String, ProbeError> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );
    let signature = sign(TAG, key_b64, &payload)?;
    let token = format!("type=master&ver=1.0&sig={}", signature);
    Ok(url::form_urlencoded::byte_serialize(token.as_bytes()).collect())
}

pub struct CosmosProbe {
    timeouts: StepTimeouts,
    client: reqwest::Client,
}

impl CosmosProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self {
            timeouts,
            client: reqwest::Client::new(),
        }
    }

    async fn get(
        &self,
        endpoint: &str,
        key: &str,
        path: &str,
        resource_type: &str,
        resource_link: &str,
    ) -> Result<reqwest::Response, ProbeError> {
        let date = http_date(Utc::now());
        let token = master_key_token(key, "GET", resource_type, resource_link, &date)?;
        let request = self
            .client
            .get(format!("{}/{}", endpoint.trim_end_matches('/'), path))
            .header("authorization", token)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .send();
        self.timeouts.connect(TAG, request).await
    }
}

#[async_trait]
impl BackendProbe for CosmosProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::CosmosDb.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let endpoint = credentials.require_str(TAG, "cosmosdb_host_endpoint")?;
        let key = credentials.require_str(TAG, "cosmosdb_master_key")?;
        let database_id = credentials.require_str(TAG, "cosmosdb_database_id")?;
        let database_link = format!("dbs/{}", database_id);

        let mut artifact = Artifact::new();

        let response = self.get(&endpoint, &key, &database_link, "dbs", &database_link).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::connection(
                TAG,
                format!("read database {} returned {}", database_id, status),
            ));
        }
        let query = format!("read database {}", database_id);
        let database: Database = self.timeouts.query(TAG, &query, response.json()).await?;
        artifact.push_json(&json!({ "id": database.id }));

        let colls_path = format!("{}/colls", database_link);
        let response = self.get(&endpoint, &key, &colls_path, "colls", &database_link).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::query(
                TAG,
                "list containers",
                format!("service returned {}", status),
            ));
        }
        let list: CollectionList = self
            .timeouts
            .query(TAG, "list containers", response.json())
            .await?;
        let ids: Vec<String> = list.collections.into_iter().map(|c| c.id).collect();
        artifact.push_json(&ids);

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_key_token_known_vector() {
        let token = master_key_token(
            "c2VjcmV0",
            "GET",
            "dbs",
            "dbs/musicdb",
            "Tue, 05 Mar 2024 07:08:09 GMT",
        )
        .unwrap();
        assert_eq!(
            token,
            "type%3Dmaster%26ver%3D1.0%26sig%3Dkfuk7hlcMCET73PXllHMVHAb6L02la4NjS2Z8n4Xves%3D"
        );
    }

    #[test]
    fn test_collection_list_shape() {
        let list: CollectionList = serde_json::from_str(
            r#"{"_rid":"x","DocumentCollections":[{"id":"Items","_rid":"y"}],"_count":1}"#,
        )
        .unwrap();
        assert_eq!(list.collections[0].id, "Items");
    }
}

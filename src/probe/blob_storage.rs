//! Blob-storage probe (tag `storage`): list the account's top-level containers.
//!
//! Talks to the Blob service REST API directly and signs requests with the
//! account's shared key.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialBundle;
use crate::probe::signing::{http_date, sign};
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "storage";
const API_VERSION: &str = "2021-08-06";

/// One container as reported by the service.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContainerEntry {
    pub name: String,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Containers", default)]
    containers: ContainerList,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerList {
    #[serde(rename = "Container", default)]
    items: Vec<ContainerXml>,
}

#[derive(Debug, Deserialize)]
struct ContainerXml {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties", default)]
    properties: PropertiesXml,
}

#[derive(Debug, Default, Deserialize)]
struct PropertiesXml {
    #[serde(rename = "Last-Modified")]
    last_modified: Option<String>,
    #[serde(rename = "Etag")]
    etag: Option<String>,
}

/// Parse a List Containers response body.
pub fn parse_container_list(body: &str) -> Result<Vec<ContainerEntry>, quick_xml::DeError> {
    let results: EnumerationResults = quick_xml::de::from_str(body.trim_start_matches('\u{feff}'))?;
    Ok(results
        .containers
        .items
        .into_iter()
        .map(|c| ContainerEntry {
            name: c.name,
            last_modified: c.properties.last_modified,
            etag: c.properties.etag,
        })
        .collect())
}

/// String-to-sign for `GET /?comp=list` under the Shared Key scheme.
pub fn list_containers_string_to_sign(account: &str, date: &str) -> String {
    // Verb, then eleven empty standard headers.
    format!(
        "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{}\nx-ms-version:{}\n/{}/\ncomp:list",
        date, API_VERSION, account
    )
}

pub struct BlobStorageProbe {
    timeouts: StepTimeouts,
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl BlobStorageProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self {
            timeouts,
            client: reqwest::Client::new(),
            endpoint: None,
        }
    }

    /// Send requests to `endpoint` instead of the account's public blob host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn base_url(&self, account: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", account),
        }
    }
}

#[async_trait]
impl BackendProbe for BlobStorageProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::Storage.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let account = credentials.require_str(TAG, "storage_account_name")?;
        let key = credentials.require_str(TAG, "primary_access_key")?;

        let date = http_date(Utc::now());
        let signature = sign(TAG, &key, &list_containers_string_to_sign(&account, &date))?;

        let url = format!("{}/?comp=list", self.base_url(&account));
        tracing::debug!(account = %account, "Listing blob containers");

        let request = self
            .client
            .get(&url)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("Authorization", format!("SharedKey {}:{}", account, signature))
            .send();
        let response = self.timeouts.connect(TAG, request).await?;

        let status = response.status();
        let body = self
            .timeouts
            .query(TAG, "list containers", response.text())
            .await?;
        if !status.is_success() {
            return Err(ProbeError::connection(
                TAG,
                format!("list containers returned {}", status),
            ));
        }

        let containers = parse_container_list(&body)
            .map_err(|e| ProbeError::query(TAG, "list containers", e))?;
        let mut artifact = Artifact::new();
        artifact.push_json(&containers);
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\
        <EnumerationResults ServiceEndpoint=\"https://acct.blob.core.windows.net/\">\
        <Containers>\
        <Container><Name>albums</Name><Properties>\
        <Last-Modified>Tue, 05 Mar 2024 07:08:09 GMT</Last-Modified><Etag>\"0x1\"</Etag>\
        </Properties></Container>\
        <Container><Name>logs</Name><Properties /></Container>\
        </Containers><NextMarker /></EnumerationResults>";

    #[test]
    fn test_parse_container_list() {
        let containers = parse_container_list(BODY).unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "albums");
        assert_eq!(containers[0].etag.as_deref(), Some("\"0x1\""));
        assert_eq!(containers[1].name, "logs");
        assert_eq!(containers[1].last_modified, None);
    }

    #[test]
    fn test_parse_empty_account() {
        let body = "<EnumerationResults><Containers /><NextMarker /></EnumerationResults>";
        assert!(parse_container_list(body).unwrap().is_empty());
    }

    #[test]
    fn test_string_to_sign_layout() {
        let s = list_containers_string_to_sign("acct", "Tue, 05 Mar 2024 07:08:09 GMT");
        let lines: Vec<&str> = s.split('\n').collect();
        assert_eq!(lines[0], "GET");
        assert!(lines[1..12].iter().all(|l| l.is_empty()));
        assert_eq!(lines[12], "x-ms-date:Tue, 05 Mar 2024 07:08:09 GMT");
        assert_eq!(lines[13], "x-ms-version:2021-08-06");
        assert_eq!(lines[14], "/acct/");
        assert_eq!(lines[15], "comp:list");
    }

    #[test]
    fn test_default_endpoint() {
        let probe = BlobStorageProbe::new(StepTimeouts::default());
        assert_eq!(probe.base_url("acct"), "https://acct.blob.core.windows.net");
        let probe = probe.with_endpoint("http://127.0.0.1:10000/");
        assert_eq!(probe.base_url("acct"), "http://127.0.0.1:10000");
    }
}

//! Big-data job-controller probe (tag `dataproc`): list the bound cluster's jobs.

use async_trait::async_trait;
use serde_json::Value;

use crate::credentials::CredentialBundle;
use crate::probe::google_auth::{ServiceAccountKey, CLOUD_PLATFORM_SCOPE};
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "dataproc";

pub struct JobControllerProbe {
    timeouts: StepTimeouts,
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl JobControllerProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self {
            timeouts,
            client: reqwest::Client::new(),
            endpoint: None,
        }
    }

    /// Send API calls to `endpoint` instead of the regional Dataproc host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn jobs_url(&self, project: &str, region: &str) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-dataproc.googleapis.com", region),
        };
        format!("{}/v1/projects/{}/regions/{}/jobs", base, project, region)
    }
}

#[async_trait]
impl BackendProbe for JobControllerProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::Dataproc.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let project = credentials.require_str(TAG, "project_id")?;
        let region = credentials.require_str(TAG, "region")?;
        let cluster = credentials.require_str(TAG, "cluster_name")?;
        let key = ServiceAccountKey::from_base64(
            TAG,
            "private_key",
            &credentials.require_str(TAG, "private_key")?,
        )?;

        let token = key
            .access_token(&self.client, &self.timeouts, TAG, CLOUD_PLATFORM_SCOPE)
            .await?;

        let query = format!("list jobs on {}", cluster);
        let request = self
            .client
            .get(self.jobs_url(&project, &region))
            .query(&[("clusterName", cluster.as_str())])
            .bearer_auth(token)
            .send();
        let response = self.timeouts.connect(TAG, request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::query(TAG, query, format!("service returned {}", status)));
        }

        let body: Value = self.timeouts.query(TAG, &query, response.json()).await?;
        let jobs = body.get("jobs").cloned().unwrap_or_else(|| Value::Array(Vec::new()));

        let mut artifact = Artifact::new();
        artifact.push_json(&jobs);
        Ok(artifact)
    }
}

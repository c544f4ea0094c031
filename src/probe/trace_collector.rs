//! Tracing-collector probe (tag `tracing`): authenticate and submit one span.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::credentials::CredentialBundle;
use crate::probe::google_auth::{ServiceAccountKey, TRACE_APPEND_SCOPE};
use crate::probe::{Artifact, BackendProbe, ProbeError, ProbeKind};
use crate::resilience::StepTimeouts;

const TAG: &str = "tracing";
const DEFAULT_ENDPOINT: &str = "https://cloudtrace.googleapis.com";
const SPAN_NAME: &str = "gen-content";

/// `batchWrite` body holding a single span.
pub fn span_batch(project: &str, trace_id: &str, span_id: &str) -> Value {
    let start = Utc::now();
    let end = start + chrono::Duration::milliseconds(1);
    json!({
        "spans": [{
            "name": format!("projects/{}/traces/{}/spans/{}", project, trace_id, span_id),
            "spanId": span_id,
            "displayName": { "value": SPAN_NAME, "truncatedByteCount": 0 },
            "startTime": start.to_rfc3339_opts(SecondsFormat::Nanos, true),
            "endTime": end.to_rfc3339_opts(SecondsFormat::Nanos, true),
        }]
    })
}

pub struct TraceCollectorProbe {
    timeouts: StepTimeouts,
    client: reqwest::Client,
    endpoint: String,
}

impl TraceCollectorProbe {
    pub fn new(timeouts: StepTimeouts) -> Self {
        Self {
            timeouts,
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl BackendProbe for TraceCollectorProbe {
    fn backend(&self) -> &'static str {
        ProbeKind::Tracing.tag()
    }

    async fn verify(&self, credentials: &CredentialBundle) -> Result<Artifact, ProbeError> {
        let project = credentials.require_str(TAG, "ProjectId")?;
        let key = ServiceAccountKey::from_base64(
            TAG,
            "PrivateKeyData",
            &credentials.require_str(TAG, "PrivateKeyData")?,
        )?;

        let token = key
            .access_token(&self.client, &self.timeouts, TAG, TRACE_APPEND_SCOPE)
            .await?;

        let trace_id = Uuid::new_v4().simple().to_string();
        let span_id = Uuid::new_v4().simple().to_string()[..16].to_string();

        let url = format!("{}/v2/projects/{}/traces:batchWrite", self.endpoint, project);
        let request = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&span_batch(&project, &trace_id, &span_id))
            .send();
        let response = self.timeouts.query(TAG, "write span", request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::query(TAG, "write span", format!("service returned {}", status)));
        }
        tracing::debug!(trace_id = %trace_id, "Span submitted");

        let mut artifact = Artifact::new();
        artifact.push_json(&json!({
            "project_id": project,
            "client_email": key.client_email,
            "trace_id": trace_id,
        }));
        Ok(artifact)
    }
}

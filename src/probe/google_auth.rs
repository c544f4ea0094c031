//! Service-account authentication for the Google Cloud probes.
//!
//! Bindings carry the service-account key as base64-encoded JSON. The key
//! signs an RS256 JWT assertion that is exchanged for a bearer token.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::probe::ProbeError;
use crate::resilience::StepTimeouts;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const TRACE_APPEND_SCOPE: &str = "https://www.googleapis.com/auth/trace.append";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Decoded service-account key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// JWT claims of the token-exchange assertion.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    /// Decode the base64 JSON key a binding carries in `field`.
    pub fn from_base64(tag: &str, field: &str, encoded: &str) -> Result<Self, ProbeError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProbeError::malformed(tag, format!("`{}` is not base64: {}", field, e)))?;
        serde_json::from_slice(&raw).map_err(|e| {
            ProbeError::malformed(tag, format!("`{}` is not a service-account key: {}", field, e))
        })
    }

    /// Signed RS256 assertion requesting `scope`, issued at `issued_at` (unix seconds).
    pub fn assertion(&self, scope: &str, issued_at: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
    }

    /// Exchange a fresh assertion for a bearer token.
    pub async fn access_token(
        &self,
        client: &reqwest::Client,
        timeouts: &StepTimeouts,
        tag: &str,
        scope: &str,
    ) -> Result<String, ProbeError> {
        let assertion = self
            .assertion(scope, chrono::Utc::now().timestamp())
            .map_err(|e| ProbeError::malformed(tag, format!("cannot sign assertion: {}", e)))?;

        let request = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send();
        let response = timeouts.connect(tag, request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::connection(
                tag,
                format!("token exchange for {} returned {}", self.client_email, status),
            ));
        }

        let token: TokenResponse = timeouts
            .connect(tag, response.json())
            .await?;
        tracing::debug!(tag = %tag, client_email = %self.client_email, "Obtained access token");
        Ok(token.access_token)
    }
}

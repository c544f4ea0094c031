//! Shared-key request signing for the Azure REST probes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::probe::ProbeError;

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 of `message` under a base64-encoded account key.
pub fn sign(tag: &str, key_b64: &str, message: &str) -> Result<String, ProbeError> {
    let key = STANDARD
        .decode(key_b64.trim())
        .map_err(|e| ProbeError::malformed(tag, format!("access key is not base64: {}", e)))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| ProbeError::malformed(tag, format!("unusable access key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// RFC 1123 date as the `x-ms-date` header expects it.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

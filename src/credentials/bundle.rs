//! Credential bundle handed to a probe.

use serde_json::{Map, Value};

use crate::probe::ProbeError;

/// Opaque field → value mapping for one service binding.
///
/// Immutable once fetched. `Debug` prints field names only.
#[derive(Clone, Default, PartialEq)]
pub struct CredentialBundle {
    fields: Map<String, Value>,
}

impl CredentialBundle {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Bundle from a JSON value; anything but an object yields an empty bundle.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String form of a scalar field. Numbers and booleans are rendered as text.
    pub fn str(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`str`](Self::str) but a missing or blank field is a credential error.
    pub fn require_str(&self, tag: &str, field: &str) -> Result<String, ProbeError> {
        match self.str(field) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(ProbeError::malformed(tag, format!("missing field `{}`", field))),
        }
    }

    /// Port given either as a JSON number or a numeric string.
    pub fn port(&self, field: &str) -> Option<u16> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean flag given as `true` or `"true"`. Absent means false.
    pub fn flag(&self, field: &str) -> bool {
        match self.fields.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("fields", &self.field_names())
            .finish()
    }
}

impl From<Map<String, Value>> for CredentialBundle {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

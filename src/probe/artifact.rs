//! Evidence collected by a successful probe.

use serde::Serialize;

/// Ordered JSON fragments; the content is their plain concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    fragments: Vec<String>,
}

impl Artifact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value` as compact JSON and append it.
    pub fn push_json<T: Serialize + ?Sized>(&mut self, value: &T) {
        // Serializing plain data into a String cannot fail; fall back to null if a
        // foreign Serialize impl reports an error.
        let fragment = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
        self.fragments.push(fragment);
    }

    /// Append already-rendered text.
    pub fn push_raw(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    /// Append every fragment of `other`, keeping its order.
    pub fn extend(&mut self, other: Artifact) {
        self.fragments.extend(other.fragments);
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn content(&self) -> String {
        self.fragments.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut artifact = Artifact::new();
        artifact.push_json(&json!([{"Tables_in_db": "album"}]));
        artifact.push_json(&Vec::<u8>::new());
        artifact.push_raw("tail");
        assert_eq!(artifact.content(), r#"[{"Tables_in_db":"album"}][]tail"#);

        let mut outer = Artifact::new();
        outer.push_raw("head");
        outer.extend(artifact);
        assert_eq!(outer.fragments().len(), 4);
        assert!(outer.content().starts_with("head["));
    }
}

//! # JSON Records
//!
//! Array-of-records tree used for persistence, import/export and as the
//! undo-log payload:
//!
//! ```json
//! [{ "kind": "paragraph", "body": [{ "kind": "text", "content": "hi", "modifiers": [] }] }]
//! ```
//!
//! Attributes are flattened into the record next to `kind`. Atomic kinds
//! (text, widgets) carry no `body`.

use crate::errors::EditorResult;
use crate::node::Attributes;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonNode {
    pub kind: String,

    #[serde(flatten)]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<JsonNode>>,
}

impl JsonNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Attributes::new(),
            body: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: JsonNode) -> Self {
        self.body.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn with_body(mut self, children: Vec<JsonNode>) -> Self {
        self.body = Some(children);
        self
    }

    pub fn children(&self) -> &[JsonNode] {
        self.body.as_deref().unwrap_or(&[])
    }
}

/// Parse a document (array of records) from JSON text
pub fn from_str(source: &str) -> EditorResult<Vec<JsonNode>> {
    Ok(serde_json::from_str(source)?)
}

/// Read a document file
pub fn read_file(path: &Path) -> EditorResult<Vec<JsonNode>> {
    let source = fs::read_to_string(path)?;
    from_str(&source)
}

/// Serialize a document (array of records) to pretty JSON text
pub fn to_string_pretty(records: &[JsonNode]) -> EditorResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EditorError;
    use serde_json::json;

    #[test]
    fn test_attributes_are_flattened() {
        let record = JsonNode::new("paragraph").with_child(
            JsonNode::new("text")
                .with_attr("content", "hi")
                .with_attr("modifiers", json!([])),
        );

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "kind": "paragraph",
                "body": [{ "kind": "text", "content": "hi", "modifiers": [] }]
            })
        );
    }

    #[test]
    fn test_decode_collects_unknown_keys_as_attributes() {
        let records = from_str(r#"[{"kind":"list","style":"ordered","body":[]}]"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "list");
        assert_eq!(records[0].attributes.get("style"), Some(&json!("ordered")));
        assert_eq!(records[0].body, Some(vec![]));
        assert!(!records[0].attributes.contains_key("body"));
    }

    #[test]
    fn test_leaf_records_have_no_body() {
        let records = from_str(r#"[{"kind":"embed","src":"a.png"}]"#).unwrap();
        assert_eq!(records[0].body, None);
        assert!(records[0].children().is_empty());
    }

    #[test]
    fn test_malformed_document_is_a_json_error() {
        let err = from_str(r#"{"kind":"paragraph"}"#).unwrap_err();
        assert!(matches!(err, EditorError::Json(_)), "{:?}", err);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("folio-missing-document.json");
        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, EditorError::Io(_)), "{:?}", err);
    }
}

//! Read-only view over parsed schema content.
//!
//! A `SchemaNode` is a (document, JSON Pointer) pair. Cloning is cheap: the
//! document is shared behind an `Arc`, so every rule that inspects a node
//! sees the same bytes the resolver produced. Two nodes are equal when they
//! come from the same URI and sit at the same path.
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

static NULL: Value = Value::Null;

/// Keywords whose children are named sub-schemas rather than schemas themselves.
const CONTAINER_KEYWORDS: &[&str] = &["properties", "definitions", "$defs", "patternProperties"];

#[derive(Clone)]
pub struct SchemaNode {
    uri: Arc<str>,
    path: String,
    document: Arc<Value>,
}

impl SchemaNode {
    /// Root node of a freshly parsed document.
    pub fn new(uri: impl Into<String>, document: Value) -> Self {
        Self {
            uri: Arc::from(uri.into()),
            path: String::new(),
            document: Arc::new(document),
        }
    }

    /// URI of the document this node was read from.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// JSON Pointer of this node inside its document (`""` for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The whole document this node belongs to.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn value(&self) -> &Value {
        self.document.pointer(&self.path).unwrap_or(&NULL)
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.value().get(keyword)
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(Value::as_str)
    }

    /// Sub-node under `keyword`, if present.
    pub fn child(&self, keyword: &str) -> Option<SchemaNode> {
        self.get(keyword)?;
        Some(self.descend(keyword))
    }

    /// Element nodes of the array under `keyword`, in order.
    pub fn items(&self, keyword: &str) -> Vec<SchemaNode> {
        let Some(child) = self.child(keyword) else {
            return Vec::new();
        };
        let len = child.value().as_array().map_or(0, Vec::len);
        (0..len).map(|i| child.descend(&i.to_string())).collect()
    }

    /// Named entries of the object under `keyword` (e.g. `properties`), in
    /// document order.
    pub fn entries(&self, keyword: &str) -> Vec<(String, SchemaNode)> {
        let Some(child) = self.child(keyword) else {
            return Vec::new();
        };
        match child.value() {
            Value::Object(map) => map
                .keys()
                .map(|name| (name.clone(), child.descend(name)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Navigate from the document root by JSON Pointer (a `#` fragment
    /// without the leading `#`).
    pub fn at_pointer(&self, pointer: &str) -> Option<SchemaNode> {
        self.document.pointer(pointer)?;
        Some(SchemaNode {
            uri: Arc::clone(&self.uri),
            path: pointer.to_string(),
            document: Arc::clone(&self.document),
        })
    }

    /// Name hint for a declaration generated from this node: its `title`,
    /// else the nearest property or definition name on its path, else the
    /// document's file stem.
    pub fn suggested_name(&self) -> String {
        if let Some(title) = self.str("title") {
            if !title.trim().is_empty() {
                return title.to_string();
            }
        }

        let segments: Vec<String> = self
            .path
            .split('/')
            .skip(1)
            .map(unescape_token)
            .collect();
        let mut suffix = String::new();
        for (i, segment) in segments.iter().enumerate().rev() {
            if segment == "items" || segment == "additionalProperties" {
                suffix.insert_str(0, "Item");
                continue;
            }
            if segment.parse::<usize>().is_ok() {
                continue;
            }
            let parent_is_container = i > 0 && CONTAINER_KEYWORDS.contains(&segments[i - 1].as_str());
            if parent_is_container {
                return format!("{segment}{suffix}");
            }
        }

        let stem = self
            .uri
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("Root");
        let stem = stem.split(['#', '?']).next().unwrap_or(stem);
        let stem = stem.split('.').next().unwrap_or(stem);
        format!("{stem}{suffix}")
    }

    fn descend(&self, token: &str) -> SchemaNode {
        SchemaNode {
            uri: Arc::clone(&self.uri),
            path: format!("{}/{}", self.path, escape_token(token)),
            document: Arc::clone(&self.document),
        }
    }
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.path == other.path
    }
}

impl Eq for SchemaNode {}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaNode({}#{})", self.uri, self.path)
    }
}

pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> SchemaNode {
        SchemaNode::new(
            "https://example.org/schemas/address.json",
            json!({
                "type": "object",
                "properties": {
                    "street": { "type": "string" },
                    "a/b": { "type": "integer" },
                    "tags": { "type": "array", "items": { "enum": ["home", "work"] } }
                },
                "definitions": {
                    "Country": { "enum": ["NL", "FI"] }
                }
            }),
        )
    }

    #[test]
    fn children_carry_uri_and_pointer() {
        let root = address();
        let street = root.child("properties").unwrap().child("street").unwrap();
        assert_eq!(street.path(), "/properties/street");
        assert_eq!(street.uri(), root.uri());
        assert_eq!(street.str("type"), Some("string"));
        assert!(!street.is_root());
    }

    #[test]
    fn entries_keep_document_order_and_escape_keys() {
        let names: Vec<String> = address()
            .entries("properties")
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["street", "a/b", "tags"]);

        let odd = address().entries("properties").remove(1).1;
        assert_eq!(odd.path(), "/properties/a~1b");
        assert_eq!(odd.str("type"), Some("integer"));
    }

    #[test]
    fn identity_is_uri_plus_path() {
        let a = address().at_pointer("/definitions/Country").unwrap();
        let b = address().child("definitions").unwrap().child("Country").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, address());
        assert!(address().at_pointer("/definitions/Missing").is_none());
    }

    #[test]
    fn suggested_names_follow_the_path() {
        let root = address();
        assert_eq!(root.suggested_name(), "address");

        let country = root.at_pointer("/definitions/Country").unwrap();
        assert_eq!(country.suggested_name(), "Country");

        let tag = root.at_pointer("/properties/tags/items").unwrap();
        assert_eq!(tag.suggested_name(), "tagsItem");

        let titled = SchemaNode::new("mem:x", json!({ "title": "Postal Code" }));
        assert_eq!(titled.suggested_name(), "Postal Code");
    }

    #[test]
    fn items_enumerates_array_elements() {
        let node = SchemaNode::new("mem:x", json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] }));
        let arms = node.items("anyOf");
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[1].path(), "/anyOf/1");
        assert_eq!(arms[1].str("type"), Some("null"));
    }
}

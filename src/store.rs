//! Schema contexts and the per-session schema cache.
//!
//! References are joined against the *original* URI of the enclosing schema,
//! then rewritten. Documents and generated types are cached by rewritten
//! location, so one original URI always reads from one place within a
//! session, and two original URIs that rewrite to the same place share a
//! single document.
use std::collections::{HashMap, HashSet};

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::error::ResolutionError;
use crate::ir::Ty;
use crate::node::SchemaNode;
use crate::resolve::{to_url, ContentResolver};

/// The schema a rule is currently working inside: the node it was reached
/// through plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    id: String,
    location: String,
    content: SchemaNode,
}

impl Schema {
    /// URI as referenced, before rewriting. Relative references join against this.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Where the content was actually read from, including the fragment.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn content(&self) -> &SchemaNode {
        &self.content
    }
}

pub struct SchemaStore {
    resolver: ContentResolver,
    documents: HashMap<String, SchemaNode>,
    types: HashMap<String, Ty>,
    in_progress: HashSet<String>,
}

impl SchemaStore {
    pub fn new(resolver: ContentResolver) -> Self {
        Self {
            resolver,
            documents: HashMap::new(),
            types: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    /// Resolve `reference` (absolute, or relative to `parent`) to a schema.
    pub fn create(&mut self, parent: Option<&Schema>, reference: &str) -> Result<Schema, ResolutionError> {
        let mut id = match parent {
            Some(parent) => {
                let base = to_url(parent.id())?;
                base.join(reference)
                    .map_err(|e| ResolutionError::unresolvable(reference, e))?
            }
            None => to_url(reference)?,
        };
        let fragment = id.fragment().map(str::to_string).unwrap_or_default();
        id.set_fragment(None);
        let document_id = id.to_string();

        let document_location = self.resolver.locate(&document_id);
        let document = self.document(&document_location)?;

        let pointer = decode_fragment(&fragment);
        let content = document.at_pointer(&pointer).ok_or_else(|| {
            ResolutionError::unresolvable(
                format!("{document_location}#{fragment}"),
                "fragment does not point into the document",
            )
        })?;

        Ok(Schema {
            id: with_fragment(&document_id, &fragment),
            location: with_fragment(&document_location, &fragment),
            content,
        })
    }

    fn document(&mut self, location: &str) -> Result<SchemaNode, ResolutionError> {
        if let Some(document) = self.documents.get(location) {
            debug!(%location, "schema document cache hit");
            return Ok(document.clone());
        }
        let document = self.resolver.resolve_located(location)?;
        self.documents.insert(location.to_string(), document.clone());
        Ok(document)
    }

    /// Type already generated for the schema at `location`.
    pub fn type_of(&self, location: &str) -> Option<&Ty> {
        self.types.get(location)
    }

    /// Record the type for `location` unless one is already recorded.
    pub fn set_type_if_empty(&mut self, location: &str, ty: Ty) {
        self.types.entry(location.to_string()).or_insert(ty);
    }

    /// Mark `location` as being generated. Returns `false` if it already was,
    /// i.e. the caller is inside a reference cycle.
    pub fn enter(&mut self, location: &str) -> bool {
        self.in_progress.insert(location.to_string())
    }

    pub fn leave(&mut self, location: &str) {
        self.in_progress.remove(location);
    }

    /// Number of distinct documents fetched so far.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl std::fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaStore")
            .field("resolver", &self.resolver)
            .field("documents", &self.documents.len())
            .field("types", &self.types.len())
            .finish()
    }
}

fn with_fragment(uri: &str, fragment: &str) -> String {
    if fragment.is_empty() || fragment == "/" {
        uri.to_string()
    } else {
        format!("{uri}#{fragment}")
    }
}

/// `/definitions/a%20b` → `/definitions/a b`. An empty fragment is the root.
fn decode_fragment(fragment: &str) -> String {
    if fragment.is_empty() || fragment == "/" {
        return String::new();
    }
    let decoded = percent_decode_str(fragment).decode_utf8_lossy().into_owned();
    if decoded.starts_with('/') { decoded } else { format!("/{decoded}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::MemoryResolver;
    use crate::rewrite::ReferenceRewriter;
    use serde_json::json;

    fn store() -> SchemaStore {
        let base = MemoryResolver::new()
            .with_document(
                "https://example.org/schemas/person.json",
                json!({
                    "type": "object",
                    "properties": { "home": { "$ref": "address.json" } },
                    "definitions": { "Name Part": { "type": "string" } }
                }),
            )
            .with_document("file:///mirror/address.json", json!({ "type": "object" }));
        let resolver = ContentResolver::new(ReferenceRewriter::new(), base);
        resolver
            .rewriter()
            .register("https://example.org/schemas/address", "file:///mirror/address");
        SchemaStore::new(resolver)
    }

    #[test]
    fn relative_references_join_against_original_id() {
        let mut store = store();
        let person = store.create(None, "https://example.org/schemas/person.json").unwrap();
        let address = store.create(Some(&person), "address.json").unwrap();
        assert_eq!(address.id(), "https://example.org/schemas/address.json");
        assert_eq!(address.location(), "file:///mirror/address.json");
        assert_eq!(address.content().str("type"), Some("object"));
    }

    #[test]
    fn fragments_navigate_inside_the_document() {
        let mut store = store();
        let person = store.create(None, "https://example.org/schemas/person.json").unwrap();
        let part = store.create(Some(&person), "#/definitions/Name%20Part").unwrap();
        assert_eq!(part.content().str("type"), Some("string"));
        assert_eq!(part.content().path(), "/definitions/Name Part");

        let root = store.create(Some(&person), "#").unwrap();
        assert_eq!(root.location(), person.location());
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn missing_fragment_is_unresolvable() {
        let mut store = store();
        let person = store.create(None, "https://example.org/schemas/person.json").unwrap();
        let err = store.create(Some(&person), "#/definitions/Nope").unwrap_err();
        assert!(matches!(err, ResolutionError::Unresolvable { .. }));
    }

    #[test]
    fn documents_are_fetched_once_per_location() {
        let mut store = store();
        for _ in 0..3 {
            store.create(None, "https://example.org/schemas/address.json").unwrap();
        }
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn type_cache_keeps_first_entry() {
        let mut store = store();
        store.set_type_if_empty("x", Ty::String);
        store.set_type_if_empty("x", Ty::Integer);
        assert_eq!(store.type_of("x"), Some(&Ty::String));
        assert!(store.enter("x"));
        assert!(!store.enter("x"));
        store.leave("x");
        assert!(store.enter("x"));
    }
}

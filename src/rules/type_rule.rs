use serde_json::Value;
use tracing::warn;

use super::{Rule, RuleKind, SchemaContext, TYPE_KEYWORD};
use crate::error::GenerateError;
use crate::ir::{Ty, TypeContainer};
use crate::node::SchemaNode;

/// Dispatch on the `type` keyword. A `"null"` member of a type list makes
/// the result optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeRule;

impl Rule for TypeRule {
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        let (declared, nullable) = declared_type(node);

        let ty = match declared.as_deref() {
            Some("object") => cx.apply(RuleKind::Object, node_name, node, container)?,
            Some("array") => cx.apply(RuleKind::Array, node_name, node, container)?,
            Some(other) => match primitive(other) {
                Some(ty) => ty,
                None => {
                    warn!(node = ?node, declared = other, "unknown type, generating any-JSON");
                    Ty::Any
                }
            },
            None if node.has("properties") => cx.apply(RuleKind::Object, node_name, node, container)?,
            None if node.has("items") => cx.apply(RuleKind::Array, node_name, node, container)?,
            None => Ty::Any,
        };

        Ok(if nullable { ty.optional() } else { ty })
    }
}

/// JSON Schema primitive type name → generated type.
pub fn primitive(name: &str) -> Option<Ty> {
    match name {
        "string" => Some(Ty::String),
        "integer" => Some(Ty::Integer),
        "number" => Some(Ty::Number),
        "boolean" => Some(Ty::Bool),
        "null" => Some(Ty::Unit),
        _ => None,
    }
}

/// The non-null type named by `type`, and whether `null` is also allowed.
/// Lists with several non-null members fall back to "no declared type".
fn declared_type(node: &SchemaNode) -> (Option<String>, bool) {
    match node.get(TYPE_KEYWORD) {
        Some(Value::String(name)) => (Some(name.clone()), false),
        Some(Value::Array(names)) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            let non_null: Vec<&str> = names.into_iter().filter(|n| *n != "null").collect();
            match non_null.as_slice() {
                [] if nullable => (Some("null".to_string()), false),
                [single] => (Some(single.to_string()), nullable),
                _ => (None, nullable),
            }
        }
        _ => (None, false),
    }
}

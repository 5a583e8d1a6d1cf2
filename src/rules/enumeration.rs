//! Enumerations.
//!
//! The enum rule is asked two different questions, told apart by the
//! keyword it receives as its node name:
//!
//! - [`TYPE_KEYWORD`]: what primitive type carries the constants?
//! - anything else (normally [`ENUM_KEYWORD`]): declare the enumeration.
//!
//! The declaration asks for its backing type through the registry rather
//! than calling itself, so an override installed for the first question is
//! honored by the second.
use serde_json::Value;

use super::type_rule::primitive;
use super::{declaration_name, Rule, RuleKind, SchemaContext, ENUM_KEYWORD, TYPE_KEYWORD};
use crate::error::GenerateError;
use crate::ir::{Decl, EnumDecl, Ty, TypeContainer};
use crate::naming;
use crate::node::SchemaNode;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumRule;

impl Rule for EnumRule {
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        if node_name == TYPE_KEYWORD {
            return Ok(backing_type(node));
        }

        let Some(Value::Array(values)) = node.get(ENUM_KEYWORD) else {
            return Err(GenerateError::InvalidSchema {
                location: format!("{node:?}"),
                reason: "`enum` must be an array of values".to_string(),
            });
        };
        let constants = values.clone();
        let base_name = match cx.declaration_name.take() {
            Some(reached_by) => declaration_name(&reached_by, node),
            None => node.suggested_name(),
        };

        let backing = cx.apply(RuleKind::Enum, TYPE_KEYWORD, node, container)?;
        let name = container.unique_name(&naming::type_name(&base_name));
        Ok(container.declare(Decl::Enum(EnumDecl {
            name,
            doc: node.str("description").map(str::to_string),
            backing,
            constants,
        })))
    }
}

/// Declared primitive `type` if there is one, otherwise the narrowest
/// primitive every constant fits.
fn backing_type(node: &SchemaNode) -> Ty {
    if let Some(ty) = node.str(TYPE_KEYWORD).and_then(primitive).filter(Ty::is_primitive) {
        return ty;
    }
    let values = node.get(ENUM_KEYWORD).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    if values.is_empty() {
        return Ty::String;
    }
    if values.iter().all(|v| v.is_i64() || v.is_u64()) {
        Ty::Integer
    } else if values.iter().all(Value::is_number) {
        Ty::Number
    } else if values.iter().all(Value::is_boolean) {
        Ty::Bool
    } else {
        Ty::String
    }
}

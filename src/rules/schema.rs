use tracing::debug;

use super::{Rule, RuleKind, SchemaContext, ENUM_KEYWORD};
use crate::error::GenerateError;
use crate::ir::{Ty, TypeContainer};
use crate::node::SchemaNode;

/// Entry point for every schema node. Follows `$ref`, sends enumerations to
/// the enum rule and everything else to the type rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaRule;

impl Rule for SchemaRule {
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        if let Some(reference) = node.str("$ref") {
            return apply_reference(node_name, reference, container, cx);
        }

        let ty = if node.has(ENUM_KEYWORD) {
            cx.declaration_name = Some(node_name.to_string());
            cx.apply(RuleKind::Enum, ENUM_KEYWORD, node, container)?
        } else {
            cx.apply(RuleKind::Type, node_name, node, container)?
        };

        if *node == *cx.schema.content() {
            let location = cx.schema.location().to_string();
            cx.store.set_type_if_empty(&location, ty.clone());
        }
        Ok(ty)
    }
}

fn apply_reference(
    node_name: &str,
    reference: &str,
    container: &mut TypeContainer,
    cx: &mut SchemaContext<'_>,
) -> Result<Ty, GenerateError> {
    let target = cx.store.create(Some(&cx.schema), reference)?;
    let location = target.location().to_string();

    if let Some(ty) = cx.store.type_of(&location) {
        debug!(%reference, %location, "reusing generated type");
        return Ok(ty.clone());
    }
    if !cx.store.enter(&location) {
        return Err(GenerateError::CircularReference { location });
    }

    let content = target.content().clone();
    let mut nested = cx.nested(target);
    let result = nested.apply(RuleKind::Schema, node_name, &content, container);
    cx.store.leave(&location);

    let ty = result?;
    cx.store.set_type_if_empty(&location, ty.clone());
    Ok(ty)
}

use super::{Rule, RuleKind, SchemaContext};
use crate::error::GenerateError;
use crate::ir::{Ty, TypeContainer};
use crate::node::SchemaNode;

/// `items` schema → list of the item type. Tuple-form `items` and missing
/// `items` both produce a list of any-JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayRule;

impl Rule for ArrayRule {
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        let item = match node.child("items") {
            Some(items) if items.value().is_object() => {
                cx.apply(RuleKind::Schema, &format!("{node_name}Item"), &items, container)?
            }
            _ => Ty::Any,
        };
        Ok(Ty::list(item))
    }
}

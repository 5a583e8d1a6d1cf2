use serde_json::Value;

use super::{declaration_name, Rule, RuleKind, SchemaContext};
use crate::error::GenerateError;
use crate::ir::{Decl, Field, StructDecl, Ty, TypeContainer};
use crate::naming;
use crate::node::SchemaNode;

/// Objects with `properties` become structs. Objects without become string
/// keyed maps of their `additionalProperties` schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectRule;

impl Rule for ObjectRule {
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        let additional = node.child("additionalProperties");
        let closed = matches!(node.get("additionalProperties"), Some(Value::Bool(false)));

        if !node.has("properties") && !closed {
            let value_ty = match additional {
                Some(schema) if schema.value().is_object() => {
                    cx.apply(RuleKind::Schema, &format!("{node_name}Value"), &schema, container)?
                }
                _ => Ty::Any,
            };
            return Ok(Ty::map(value_ty));
        }

        let name = container.unique_name(&naming::type_name(&declaration_name(node_name, node)));
        let ty = Ty::Named(name.clone());
        container.reserve(&name);
        if node == cx.schema.content() {
            let location = cx.schema.location().to_string();
            cx.store.set_type_if_empty(&location, ty.clone());
        }

        let required: Vec<&str> = node
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        for (property, schema) in node.entries("properties") {
            let property_ty = cx.apply(RuleKind::Schema, &property, &schema, container)?;
            let is_required = required.contains(&property.as_str());
            fields.push(Field {
                ty: if is_required { property_ty } else { property_ty.optional() },
                required: is_required,
                doc: schema.str("description").map(str::to_string),
                name: property,
            });
        }

        container.declare(Decl::Struct(StructDecl {
            name,
            doc: node.str("description").map(str::to_string),
            fields,
            deny_unknown_fields: closed,
        }));
        Ok(ty)
    }
}

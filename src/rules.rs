//! Rule dispatch.
//!
//! Every schema construct (object, array, enum, ...) is handled by exactly
//! one active [`Rule`], looked up by [`RuleKind`] in a [`RuleRegistry`].
//! Rules call each other through the registry, never directly, so replacing
//! one kind's rule changes behavior everywhere that kind is reached.
//!
//! A [`RuleOverride`] wraps the rule it replaces: it answers a fixed set of
//! keywords itself and hands every other request to the wrapped rule.
pub mod array;
pub mod enumeration;
pub mod object;
pub mod schema;
pub mod type_rule;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::GenerateError;
use crate::ir::{Ty, TypeContainer};
use crate::node::SchemaNode;
use crate::store::{Schema, SchemaStore};

pub use array::ArrayRule;
pub use enumeration::EnumRule;
pub use object::ObjectRule;
pub use schema::SchemaRule;
pub use type_rule::TypeRule;

/// Keyword that declares a node's primitive type.
pub const TYPE_KEYWORD: &str = "type";
/// Keyword that lists an enumeration's allowed values.
pub const ENUM_KEYWORD: &str = "enum";

/// What kind of schema construct a rule generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    /// Entry point for any schema: `$ref` handling and dispatch by shape.
    Schema,
    /// Dispatch on the `type` keyword, primitives included.
    Type,
    Object,
    Array,
    Enum,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Schema,
        RuleKind::Type,
        RuleKind::Object,
        RuleKind::Array,
        RuleKind::Enum,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Schema => "schema",
            RuleKind::Type => "type",
            RuleKind::Object => "object",
            RuleKind::Array => "array",
            RuleKind::Enum => "enum",
        };
        f.write_str(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONTEXT
// ————————————————————————————————————————————————————————————————————————————

/// Everything a rule may consult besides the node itself: the enclosing
/// schema, the registry to dispatch sub-rules through, and the session's
/// schema store for `$ref`s.
pub struct SchemaContext<'a> {
    pub schema: Schema,
    pub rules: &'a RuleRegistry,
    pub store: &'a mut SchemaStore,
    /// Name the schema rule reached an enumeration by. Enum rules only see
    /// the keyword they are asked about, so the name travels here.
    declaration_name: Option<String>,
}

impl<'a> SchemaContext<'a> {
    pub fn new(schema: Schema, rules: &'a RuleRegistry, store: &'a mut SchemaStore) -> Self {
        Self { schema, rules, store, declaration_name: None }
    }

    /// Context for generating inside another (referenced) schema.
    pub fn nested(&mut self, schema: Schema) -> SchemaContext<'_> {
        SchemaContext {
            schema,
            rules: self.rules,
            store: &mut *self.store,
            declaration_name: None,
        }
    }

    /// Apply the active rule for `kind`.
    pub fn apply(
        &mut self,
        kind: RuleKind,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
    ) -> Result<Ty, GenerateError> {
        let rules = self.rules;
        rules.apply(kind, node_name, node, container, self)
    }
}

/// Name for a declaration generated from `node`: its `title`, then the
/// definition name for nodes under `definitions`, then `node_name`.
pub(crate) fn declaration_name(node_name: &str, node: &SchemaNode) -> String {
    if node.str("title").is_some_and(|t| !t.trim().is_empty()) {
        return node.suggested_name();
    }
    let parent = node.path().rsplit('/').nth(1);
    if matches!(parent, Some("definitions" | "$defs")) {
        return node.suggested_name();
    }
    node_name.to_string()
}

// ————————————————————————————————————————————————————————————————————————————
// RULES
// ————————————————————————————————————————————————————————————————————————————

pub trait Rule: Send + Sync {
    /// Generate the type for `node`, registering any new declarations in
    /// `container`. `node_name` is the property or root name the node was
    /// reached by; the enum rule receives the keyword being processed.
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError>;
}

/// Rule kind → active rule. Every kind always has exactly one rule.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: [Arc<dyn Rule>; 5], // indexed by RuleKind, in RuleKind::ALL order
}

impl RuleRegistry {
    /// The base rule set.
    pub fn standard() -> Self {
        Self {
            rules: [
                Arc::new(SchemaRule),
                Arc::new(TypeRule),
                Arc::new(ObjectRule),
                Arc::new(ArrayRule),
                Arc::new(EnumRule),
            ],
        }
    }

    /// The base rule set with enumerations carried as strings.
    pub fn string_backed_enums() -> Self {
        let mut registry = Self::standard();
        registry.override_rule(RuleKind::Enum, RuleOverride::string_backed_enum);
        registry
    }

    pub fn rule_for(&self, kind: RuleKind) -> Arc<dyn Rule> {
        Arc::clone(&self.rules[kind.index()])
    }

    /// Replace the rule for `kind` with whatever `wrap` builds from the
    /// current one.
    pub fn override_rule<F, R>(&mut self, kind: RuleKind, wrap: F)
    where
        F: FnOnce(Arc<dyn Rule>) -> R,
        R: Rule + 'static,
    {
        let current = self.rule_for(kind);
        self.rules[kind.index()] = Arc::new(wrap(current));
    }

    pub fn apply(
        &self,
        kind: RuleKind,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        trace!(%kind, node_name, node = ?node, "applying rule");
        self.rule_for(kind).apply(node_name, node, container, cx)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry").field("kinds", &RuleKind::ALL).finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OVERRIDES
// ————————————————————————————————————————————————————————————————————————————

/// Answer for an intercepted keyword.
pub type Intercept = Arc<
    dyn Fn(&str, &SchemaNode, &mut TypeContainer, &mut SchemaContext<'_>) -> Result<Ty, GenerateError>
        + Send
        + Sync,
>;

/// A rule that answers some keywords itself and delegates the rest to the
/// rule it wraps. Overrides of the same kind stack: each wraps the one
/// installed before it.
#[derive(Clone)]
pub struct RuleOverride {
    wrapped: Arc<dyn Rule>,
    intercepts: IndexMap<String, Intercept>,
}

impl RuleOverride {
    pub fn new(wrapped: Arc<dyn Rule>) -> Self {
        Self { wrapped, intercepts: IndexMap::new() }
    }

    /// Answer requests for `keyword` with `answer` instead of the wrapped rule.
    pub fn intercept<F>(mut self, keyword: impl Into<String>, answer: F) -> Self
    where
        F: Fn(&str, &SchemaNode, &mut TypeContainer, &mut SchemaContext<'_>) -> Result<Ty, GenerateError>
            + Send
            + Sync
            + 'static,
    {
        self.intercepts.insert(keyword.into(), Arc::new(answer));
        self
    }

    /// Enum override: the backing-type keyword always yields a plain string;
    /// the value list and everything else go to the wrapped rule.
    pub fn string_backed_enum(wrapped: Arc<dyn Rule>) -> Self {
        Self::new(wrapped).intercept(TYPE_KEYWORD, |_, _, _, _| Ok(Ty::String))
    }

    pub fn wrapped(&self) -> &Arc<dyn Rule> {
        &self.wrapped
    }

    pub fn intercepts(&self, keyword: &str) -> bool {
        self.intercepts.contains_key(keyword)
    }
}

impl Rule for RuleOverride {
    fn apply(
        &self,
        node_name: &str,
        node: &SchemaNode,
        container: &mut TypeContainer,
        cx: &mut SchemaContext<'_>,
    ) -> Result<Ty, GenerateError> {
        match self.intercepts.get(node_name) {
            Some(answer) => {
                trace!(keyword = node_name, node = ?node, "override intercepted");
                answer(node_name, node, container, cx)
            }
            None => self.wrapped.apply(node_name, node, container, cx),
        }
    }
}

impl fmt::Debug for RuleOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleOverride")
            .field("intercepts", &self.intercepts.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::with_context;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Ty);

    impl Rule for Fixed {
        fn apply(&self, _: &str, _: &SchemaNode, _: &mut TypeContainer, _: &mut SchemaContext<'_>) -> Result<Ty, GenerateError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn every_kind_has_a_rule() {
        let registry = RuleRegistry::standard();
        for kind in RuleKind::ALL {
            let _ = registry.rule_for(kind);
        }
    }

    #[test]
    fn override_receives_the_previous_rule() {
        let mut registry = RuleRegistry::standard();
        registry.override_rule(RuleKind::Type, |_| Fixed(Ty::Bool));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        registry.override_rule(RuleKind::Type, move |previous| {
            counter.fetch_add(1, Ordering::SeqCst);
            RuleOverride::new(previous)
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // the pass-through override delegates to Fixed(Bool)
        let ty = with_context(&registry, json!({ "type": "string" }), |node, c, cx| {
            cx.apply(RuleKind::Type, "x", node, c)
        })
        .unwrap();
        assert_eq!(ty, Ty::Bool);
    }

    #[test]
    fn overriding_one_kind_leaves_the_others_alone() {
        let mut registry = RuleRegistry::standard();
        registry.override_rule(RuleKind::Array, |_| Fixed(Ty::Unit));

        let ty = with_context(&registry, json!({ "type": "integer" }), |node, c, cx| {
            cx.apply(RuleKind::Type, "x", node, c)
        })
        .unwrap();
        assert_eq!(ty, Ty::Integer);
    }

    #[test]
    fn stacked_overrides_each_see_their_own_keywords() {
        let mut registry = RuleRegistry::standard();
        registry.override_rule(RuleKind::Enum, |prev| {
            RuleOverride::new(prev).intercept("first", |_, _, _, _| Ok(Ty::Integer))
        });
        registry.override_rule(RuleKind::Enum, |prev| {
            RuleOverride::new(prev).intercept("second", |_, _, _, _| Ok(Ty::Number))
        });

        let results = with_context(&registry, json!({ "enum": [true, false] }), |node, c, cx| {
            [
                cx.apply(RuleKind::Enum, "first", node, c).unwrap(),
                cx.apply(RuleKind::Enum, "second", node, c).unwrap(),
                cx.apply(RuleKind::Enum, TYPE_KEYWORD, node, c).unwrap(),
            ]
        });
        assert_eq!(results, [Ty::Integer, Ty::Number, Ty::Bool]);
    }

    #[test]
    fn override_reports_its_keywords() {
        let o = RuleOverride::string_backed_enum(RuleRegistry::standard().rule_for(RuleKind::Enum));
        assert!(o.intercepts(TYPE_KEYWORD));
        assert!(!o.intercepts(ENUM_KEYWORD));
    }
}

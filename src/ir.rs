// Generated-type model: handles returned by rules and the declaration table
// they register into. No serde_json::Value schema content here except enum
// constants, which are kept verbatim.

use indexmap::IndexMap;
use serde_json::Value;

/// Handle to a generated type, as returned by a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Unit,                    // exactly null
    Bool,
    Integer,
    Number,
    String,
    Any,                     // arbitrary JSON
    List(Box<Ty>),
    Map(Box<Ty>),            // string keys
    Optional(Box<Ty>),
    Named(String),           // a declaration in the TypeContainer
}

impl Ty {
    pub fn optional(self) -> Ty {
        match self {
            Ty::Optional(_) | Ty::Unit | Ty::Any => self,
            other => Ty::Optional(Box::new(other)),
        }
    }

    pub fn list(item: Ty) -> Ty {
        Ty::List(Box::new(item))
    }

    pub fn map(value: Ty) -> Ty {
        Ty::Map(Box::new(value))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Ty::Bool | Ty::Integer | Ty::Number | Ty::String)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,        // as written in the schema
    pub ty: Ty,              // already Optional when not required
    pub required: bool,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
    pub deny_unknown_fields: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub doc: Option<String>,
    pub backing: Ty,         // primitive the constants are carried as
    pub constants: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Struct(s) => &s.name,
            Decl::Enum(e) => &e.name,
        }
    }
}

/// Symbol table of generated declarations for one session. Names are
/// unique; iteration follows registration order so output is stable.
#[derive(Debug, Clone, Default)]
pub struct TypeContainer {
    decls: IndexMap<String, Decl>,
}

impl TypeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base`, or `base` with the smallest numeric suffix that is still free.
    pub fn unique_name(&self, base: &str) -> String {
        if !self.decls.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{base}{i}"))
            .find(|candidate| !self.decls.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Claim `name` with an empty struct so references to it can be handed
    /// out before its fields are known. A later [`declare`](Self::declare)
    /// replaces it in place.
    pub fn reserve(&mut self, name: &str) {
        self.decls.entry(name.to_string()).or_insert_with(|| {
            Decl::Struct(StructDecl {
                name: name.to_string(),
                doc: None,
                fields: Vec::new(),
                deny_unknown_fields: false,
            })
        });
    }

    pub fn declare(&mut self, decl: Decl) -> Ty {
        let name = decl.name().to_string();
        self.decls.insert(name.clone(), decl);
        Ty::Named(name)
    }

    pub fn get(&self, name: &str) -> Option<&Decl> {
        self.decls.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.decls.values()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

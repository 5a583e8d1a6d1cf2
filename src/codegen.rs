//! Rust source emitter over a [`TypeContainer`].
//!
//! One item per declaration, in registration order, so the same schemas
//! always produce byte-identical output.
use std::collections::HashSet;
use std::fmt::Write;

use serde_json::Value;

use crate::ir::{Decl, EnumDecl, Field, StructDecl, Ty, TypeContainer};
use crate::naming;

const HEADER: &str = "\
// @generated by schemagen. Do not edit by hand.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct Codegen {
    out: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Codegen {
    pub fn new() -> Self {
        Self { out: HEADER.to_string() }
    }

    pub fn emit(&mut self, container: &TypeContainer) {
        let boxed = recursive_fields(container);
        for decl in container.decls() {
            self.out.push('\n');
            match decl {
                Decl::Struct(s) => self.emit_struct(s, &boxed),
                Decl::Enum(e) if e.backing == Ty::String => self.emit_string_enum(e),
                Decl::Enum(e) => self.emit_newtype_enum(e),
            }
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn emit_struct(&mut self, decl: &StructDecl, boxed: &HashSet<(String, String)>) {
        let out = &mut self.out;
        write_doc(out, "", decl.doc.as_deref());
        out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        if decl.deny_unknown_fields {
            out.push_str("#[serde(deny_unknown_fields)]\n");
        }
        if decl.fields.is_empty() {
            let _ = writeln!(out, "pub struct {} {{}}", decl.name);
            return;
        }
        let _ = writeln!(out, "pub struct {} {{", decl.name);
        let mut taken = Vec::new();
        for field in &decl.fields {
            let indirect = boxed.contains(&(decl.name.clone(), field.name.clone()));
            emit_field(out, field, indirect, &mut taken);
        }
        out.push_str("}\n");
    }

    fn emit_string_enum(&mut self, decl: &EnumDecl) {
        let out = &mut self.out;
        write_doc(out, "", decl.doc.as_deref());
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]\n");
        let _ = writeln!(out, "pub enum {} {{", decl.name);

        let mut seen = Vec::new();
        let mut taken = Vec::new();
        for constant in &decl.constants {
            let wire = string_form(constant);
            if seen.contains(&wire) {
                continue;
            }
            let variant = naming::dedupe(naming::variant_name(&wire), &mut taken);
            let _ = writeln!(out, "    #[serde(rename = {wire:?})]");
            let _ = writeln!(out, "    {variant},");
            seen.push(wire);
        }
        out.push_str("}\n");
    }

    fn emit_newtype_enum(&mut self, decl: &EnumDecl) {
        let out = &mut self.out;
        let inner = render_ty(&decl.backing);
        write_doc(out, "", decl.doc.as_deref());
        let derives = match decl.backing {
            Ty::Number => "Debug, Clone, Copy, PartialEq, Serialize, Deserialize",
            _ => "Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize",
        };
        let _ = writeln!(out, "#[derive({derives})]");
        out.push_str("#[serde(transparent)]\n");
        let _ = writeln!(out, "pub struct {}(pub {inner});", decl.name);

        let constants: Vec<(String, String)> = decl
            .constants
            .iter()
            .filter_map(|c| Some((c.to_string(), literal(&decl.backing, c)?)))
            .collect();
        if constants.is_empty() {
            return;
        }
        let _ = writeln!(out, "\nimpl {} {{", decl.name);
        let mut taken = Vec::new();
        for (raw, literal) in constants {
            let name = naming::dedupe(naming::const_name(&raw), &mut taken);
            let _ = writeln!(out, "    pub const {name}: {0} = {0}({literal});", decl.name);
        }
        out.push_str("}\n");
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

/// Rust type expression for `ty`.
pub fn render_ty(ty: &Ty) -> String {
    match ty {
        Ty::Unit => "()".to_string(),
        Ty::Bool => "bool".to_string(),
        Ty::Integer => "i64".to_string(),
        Ty::Number => "f64".to_string(),
        Ty::String => "String".to_string(),
        Ty::Any => "serde_json::Value".to_string(),
        Ty::List(item) => format!("Vec<{}>", render_ty(item)),
        Ty::Map(value) => format!("std::collections::BTreeMap<String, {}>", render_ty(value)),
        Ty::Optional(inner) => format!("Option<{}>", render_ty(inner)),
        Ty::Named(name) => name.clone(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn emit_field(out: &mut String, field: &Field, indirect: bool, taken: &mut Vec<String>) {
    let ident = naming::dedupe(naming::field_name(&field.name), taken);
    let optional = matches!(field.ty, Ty::Optional(_));

    let mut attrs = Vec::new();
    if ident.trim_start_matches("r#") != field.name {
        attrs.push(format!("rename = {:?}", field.name));
    }
    if optional {
        attrs.push("default".to_string());
        attrs.push("skip_serializing_if = \"Option::is_none\"".to_string());
    }

    write_doc(out, "    ", field.doc.as_deref());
    if !attrs.is_empty() {
        let _ = writeln!(out, "    #[serde({})]", attrs.join(", "));
    }
    let _ = writeln!(out, "    pub {ident}: {},", field_ty(&field.ty, indirect));
}

fn field_ty(ty: &Ty, indirect: bool) -> String {
    match ty {
        Ty::Named(name) if indirect => format!("Box<{name}>"),
        Ty::Optional(inner) => format!("Option<{}>", field_ty(inner, indirect)),
        other => render_ty(other),
    }
}

/// The struct a field embeds by value, if any. `Vec` and map values are
/// already behind a pointer.
fn embedded_struct<'a>(ty: &'a Ty, container: &TypeContainer) -> Option<&'a str> {
    match ty {
        Ty::Named(name) if matches!(container.get(name), Some(Decl::Struct(_))) => Some(name.as_str()),
        Ty::Optional(inner) => embedded_struct(inner, container),
        _ => None,
    }
}

fn embeds<'a>(container: &'a TypeContainer, name: &str) -> Vec<&'a str> {
    match container.get(name) {
        Some(Decl::Struct(s)) => s
            .fields
            .iter()
            .filter_map(|f| embedded_struct(&f.ty, container))
            .collect(),
        _ => Vec::new(),
    }
}

fn reaches(container: &TypeContainer, from: &str, to: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if seen.insert(current) {
            stack.extend(embeds(container, current));
        }
    }
    false
}

/// `(struct, field)` pairs that must be boxed: fields embedding a struct
/// which embeds, directly or transitively, the field's own struct.
fn recursive_fields(container: &TypeContainer) -> HashSet<(String, String)> {
    let mut boxed = HashSet::new();
    for decl in container.decls() {
        let Decl::Struct(s) = decl else { continue };
        for field in &s.fields {
            if let Some(target) = embedded_struct(&field.ty, container) {
                if reaches(container, target, &s.name) {
                    boxed.insert((s.name.clone(), field.name.clone()));
                }
            }
        }
    }
    boxed
}

fn write_doc(out: &mut String, indent: &str, doc: Option<&str>) {
    let Some(doc) = doc else { return };
    for line in doc.trim().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            let _ = writeln!(out, "{indent}///");
        } else {
            let _ = writeln!(out, "{indent}/// {line}");
        }
    }
}

/// Wire form of a constant carried as a string.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rust literal for `value` under `backing`, if it fits.
fn literal(backing: &Ty, value: &Value) -> Option<String> {
    match backing {
        Ty::Integer => value.as_i64().map(|i| i.to_string()),
        Ty::Number => value.as_f64().filter(|f| f.is_finite()).map(|f| format!("{f:?}")),
        Ty::Bool => value.as_bool().map(|b| b.to_string()),
        _ => None,
    }
}

//! Identifier derivation for generated Rust.
use once_cell::sync::Lazy;
use regex::Regex;

static WORD_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());
static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro", "match", "mod", "move",
    "mut", "priv", "pub", "ref", "return", "static", "struct", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

// cannot be raw identifiers
const RESERVED: &[&str] = &["crate", "self", "super", "Self"];

fn words(raw: &str) -> Vec<String> {
    let spaced = CAMEL_BOUNDARY.replace_all(raw, "$1 $2");
    WORD_SPLIT
        .split(&spaced)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `postal-code` → `PostalCode`.
pub fn type_name(raw: &str) -> String {
    let name: String = words(raw).iter().map(|w| capitalize(w)).collect();
    if name.is_empty() {
        return "Type".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("T{name}");
    }
    if RESERVED.contains(&name.as_str()) {
        return format!("{name}Type");
    }
    name
}

/// `postalCode` → `postal_code`, escaping keywords.
pub fn field_name(raw: &str) -> String {
    let name = words(raw)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() {
        return "field".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{name}");
    }
    if RESERVED.contains(&name.as_str()) {
        return format!("{name}_");
    }
    if KEYWORDS.contains(&name.as_str()) {
        return format!("r#{name}");
    }
    name
}

/// Enum variant for a string constant: `in-progress` → `InProgress`.
pub fn variant_name(raw: &str) -> String {
    let name: String = words(raw).iter().map(|w| capitalize(w)).collect();
    if name.is_empty() {
        return "Empty".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("V{name}");
    }
    if RESERVED.contains(&name.as_str()) {
        return format!("{name}Value");
    }
    name
}

/// Associated constant for a non-string enum value: `1.5` → `V1_5`, `true` → `TRUE`.
pub fn const_name(raw: &str) -> String {
    let negative = raw.starts_with('-');
    let name = words(raw)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    let name = if name.is_empty() { "EMPTY".to_string() } else { name };
    let name = if negative { format!("MINUS_{name}") } else { name };
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("V{name}");
    }
    name
}

/// Make `candidate` unique among `taken`, appending a counter if needed.
pub fn dedupe(candidate: String, taken: &mut Vec<String>) -> String {
    let mut name = candidate.clone();
    let mut i = 2;
    while taken.contains(&name) {
        name = format!("{candidate}{i}");
        i += 1;
    }
    taken.push(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(type_name("postal-code"), "PostalCode");
        assert_eq!(type_name("address"), "Address");
        assert_eq!(type_name("tagsItem"), "TagsItem");
        assert_eq!(type_name("2fa settings"), "T2faSettings");
        assert_eq!(type_name("self"), "SelfType");
        assert_eq!(type_name("---"), "Type");
    }

    #[test]
    fn field_names() {
        assert_eq!(field_name("postalCode"), "postal_code");
        assert_eq!(field_name("HTTPStatus"), "httpstatus");
        assert_eq!(field_name("type"), "r#type");
        assert_eq!(field_name("self"), "self_");
        assert_eq!(field_name("$id"), "id");
        assert_eq!(field_name("3d"), "_3d");
    }

    #[test]
    fn variant_and_const_names() {
        assert_eq!(variant_name("in-progress"), "InProgress");
        assert_eq!(variant_name("NL"), "NL");
        assert_eq!(variant_name("1"), "V1");
        assert_eq!(variant_name(""), "Empty");
        assert_eq!(const_name("1.5"), "V1_5");
        assert_eq!(const_name("-3"), "MINUS_3");
        assert_eq!(const_name("true"), "TRUE");
    }

    #[test]
    fn dedupe_appends_counter() {
        let mut taken = Vec::new();
        assert_eq!(dedupe("A".into(), &mut taken), "A");
        assert_eq!(dedupe("A".into(), &mut taken), "A2");
        assert_eq!(dedupe("A".into(), &mut taken), "A3");
    }
}

use std::sync::Arc;

use serde_json::json;

use schemagen::codegen::Codegen;
use schemagen::config::{PropertyProvider, Settings};
use schemagen::ir::{Decl, Ty, TypeContainer};
use schemagen::resolve::MemoryResolver;
use schemagen::{BaseResolver, ContentResolver, Generator, ReferenceRewriter, ResolutionError, RuleRegistry};

const MIRROR_URL: &str = "https://example.org/schemas/";

fn write(dir: &std::path::Path, name: &str, contents: serde_json::Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(&contents).unwrap()).unwrap();
}

#[test]
fn mirror_url_reads_from_local_source_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "address.json",
        json!({ "type": "object", "properties": { "city": { "type": "string" } }, "required": ["city"] }),
    );
    write(
        dir.path(),
        "order.json",
        json!({ "type": "object", "properties": { "shipTo": { "$ref": "address.json" } } }),
    );

    let properties: PropertyProvider = [("json_schema_url", MIRROR_URL)].into_iter().collect();
    let settings = Settings::new().with_provider(properties);

    let mut generator = Generator::new(RuleRegistry::string_backed_enums(), ContentResolver::with_default_base());
    let sources = [dir.path().display().to_string()];
    assert_eq!(generator.setup(&sources, settings.mirror_url().as_deref()), 1);

    let mut container = TypeContainer::new();
    let ty = generator
        .generate(&format!("{MIRROR_URL}order.json"), "Order", &mut container)
        .unwrap();
    assert_eq!(ty, Ty::Named("Order".into()));

    let Some(Decl::Struct(order)) = container.get("Order") else { panic!("Order missing") };
    assert_eq!(order.fields[0].ty, Ty::Named("ShipTo".into()).optional());
    assert!(container.contains("ShipTo"));
    assert_eq!(generator.document_count(), 2);
}

#[test]
fn without_mirror_url_references_resolve_as_given() {
    let base = Arc::new(
        MemoryResolver::new().with_document(format!("{MIRROR_URL}address.json"), json!({ "type": "string" })),
    );
    let resolver = ContentResolver::new(ReferenceRewriter::new(), Arc::clone(&base));

    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::new().with_provider(PropertyProvider::new());
    let registered = resolver.register_local_mirrors(settings.mirror_url().as_deref(), &[dir.path().display().to_string()]);
    assert_eq!(registered, 0);

    let direct = base.resolve(&format!("{MIRROR_URL}address.json")).unwrap();
    let through = resolver.resolve(&format!("{MIRROR_URL}address.json")).unwrap();
    assert_eq!(through, direct);
    assert_eq!(
        base.requests(),
        vec![format!("{MIRROR_URL}address.json"), format!("{MIRROR_URL}address.json")]
    );
}

#[test]
fn same_reference_reads_same_location_within_a_session() {
    let base = Arc::new(
        MemoryResolver::new()
            .with_document("file:///mirror/address.json", json!({ "type": "object", "properties": {} }))
            .with_document(
                "file:///mirror/root.json",
                json!({
                    "type": "object",
                    "properties": {
                        "a": { "$ref": "https://example.org/schemas/address.json" },
                        "b": { "$ref": "https://example.org/schemas/address.json" }
                    }
                }),
            ),
    );
    let resolver = ContentResolver::new(ReferenceRewriter::new(), Arc::clone(&base));
    resolver.rewriter().register(MIRROR_URL, "file:///mirror/");
    assert_eq!(
        resolver.locate("https://example.org/schemas/address.json"),
        resolver.locate("https://example.org/schemas/address.json")
    );

    let mut generator = Generator::new(RuleRegistry::standard(), resolver);
    let mut container = TypeContainer::new();
    generator
        .generate("https://example.org/schemas/root.json", "Root", &mut container)
        .unwrap();

    let requests = base.requests();
    assert_eq!(requests, vec!["file:///mirror/root.json", "file:///mirror/address.json"]);
}

#[test]
fn unresolvable_mirror_target_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut generator = Generator::new(RuleRegistry::standard(), ContentResolver::with_default_base());
    generator.setup(&[dir.path().display().to_string()], Some(MIRROR_URL));

    let err = generator
        .generate(&format!("{MIRROR_URL}missing.json"), "Missing", &mut TypeContainer::new())
        .unwrap_err();
    let uri = match err {
        schemagen::GenerateError::Resolution(ResolutionError::Unresolvable { uri, .. }) => uri,
        other => panic!("expected an unresolvable reference, got {other}"),
    };
    assert!(uri.starts_with("file://"), "{uri}");
}

#[test]
fn integer_enum_is_emitted_as_string_enum() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "priority.json",
        json!({ "title": "Priority", "type": "integer", "enum": [1, 2, 3] }),
    );

    let mut generator = Generator::new(RuleRegistry::string_backed_enums(), ContentResolver::with_default_base());
    let mut container = TypeContainer::new();
    let source = dir.path().join("priority.json").display().to_string();
    generator.generate_source(&source, None, &mut container).unwrap();

    let Some(Decl::Enum(priority)) = container.get("Priority") else { panic!("Priority missing") };
    assert_eq!(priority.backing, Ty::String);
    assert_eq!(priority.constants, vec![json!(1), json!(2), json!(3)]);

    let mut cg = Codegen::new();
    cg.emit(&container);
    let src = cg.into_string();
    assert!(src.contains("pub enum Priority {"));
    for value in ["1", "2", "3"] {
        assert!(src.contains(&format!("#[serde(rename = \"{value}\")]\n    V{value},")), "{src}");
    }

    let mut generator = Generator::new(RuleRegistry::standard(), ContentResolver::with_default_base());
    let mut container = TypeContainer::new();
    generator.generate_source(&source, None, &mut container).unwrap();
    let Some(Decl::Enum(priority)) = container.get("Priority") else { panic!("Priority missing") };
    assert_eq!(priority.backing, Ty::Integer);
}

#[test]
fn mutually_recursive_definitions_emit_boxed_fields() {
    let base = MemoryResolver::new().with_document(
        "https://x.test/a.json",
        json!({
            "type": "object",
            "properties": { "b": { "$ref": "#/definitions/B" } },
            "definitions": {
                "B": { "type": "object", "properties": { "a": { "$ref": "#" } } }
            }
        }),
    );
    let mut generator = Generator::new(RuleRegistry::standard(), ContentResolver::new(ReferenceRewriter::new(), base));
    let mut container = TypeContainer::new();
    generator.generate("https://x.test/a.json", "A", &mut container).unwrap();

    let mut cg = Codegen::new();
    cg.emit(&container);
    let src = cg.into_string();
    assert!(src.contains("    pub b: Option<Box<B>>,"), "{src}");
    assert!(src.contains("    pub a: Option<Box<A>>,"), "{src}");
}

#[test]
fn root_enum_takes_the_requested_name() {
    let base = MemoryResolver::new().with_document("https://x.test/a.json", json!({ "enum": ["x", "y"] }));
    let mut generator = Generator::new(
        RuleRegistry::string_backed_enums(),
        ContentResolver::new(ReferenceRewriter::new(), base),
    );
    let mut container = TypeContainer::new();
    let ty = generator.generate("https://x.test/a.json", "Status", &mut container).unwrap();
    assert_eq!(ty, Ty::Named("Status".into()));
    assert!(matches!(container.get("Status"), Some(Decl::Enum(_))));
}

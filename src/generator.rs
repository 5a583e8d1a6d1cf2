//! A generation session: configure the resolver once, then apply the rule
//! registry to each root schema, collecting declarations into one
//! [`TypeContainer`].
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{GenerateError, ResolutionError};
use crate::ir::{Ty, TypeContainer};
use crate::resolve::{local_directory, ContentResolver};
use crate::rewrite::ReferenceRewriter;
use crate::rules::{RuleKind, RuleRegistry, SchemaContext};
use crate::store::SchemaStore;

/// Extensions picked up when a source is a directory.
const SCHEMA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Debug)]
pub struct Generator {
    rules: RuleRegistry,
    store: SchemaStore,
}

impl Generator {
    pub fn new(rules: RuleRegistry, resolver: ContentResolver) -> Self {
        Self { rules, store: SchemaStore::new(resolver) }
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn rewriter(&self) -> &ReferenceRewriter {
        self.store.resolver().rewriter()
    }

    /// Register fixed prefix rewrites, in order.
    pub fn register_rewrites<'a>(&self, rewrites: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (prefix, replacement) in rewrites {
            self.rewriter().register(prefix, replacement);
        }
    }

    /// Session setup: every source that is a local directory becomes the
    /// mirror of `mirror_url`. Must run before the first [`generate`](Self::generate).
    pub fn setup<S: AsRef<str>>(&self, sources: &[S], mirror_url: Option<&str>) -> usize {
        self.store.resolver().register_local_mirrors(mirror_url, sources)
    }

    /// Generate the schema at `uri` as `root_name`.
    pub fn generate(&mut self, uri: &str, root_name: &str, container: &mut TypeContainer) -> Result<Ty, GenerateError> {
        let schema = self.store.create(None, uri)?;
        info!(%uri, location = schema.location(), root_name, "generating");
        let node = schema.content().clone();
        let mut cx = SchemaContext::new(schema, &self.rules, &mut self.store);
        cx.apply(RuleKind::Schema, root_name, &node, container)
    }

    /// Generate one source. A directory expands to the schema files directly
    /// inside it, in name order, each named after its file stem; anything
    /// else is a single schema named `root_name`, or its own stem.
    pub fn generate_source(
        &mut self,
        source: &str,
        root_name: Option<&str>,
        container: &mut TypeContainer,
    ) -> Result<Vec<Ty>, GenerateError> {
        if let Some(dir) = local_directory(source) {
            let path = dir
                .to_file_path()
                .map_err(|_| ResolutionError::unresolvable(source, "not a local directory"))?;
            let files = schema_files(&path)?;
            info!(%source, files = files.len(), "expanding source directory");
            let mut types = Vec::with_capacity(files.len());
            for file in files {
                let name = file_stem(&file.display().to_string());
                types.push(self.generate(&file.display().to_string(), &name, container)?);
            }
            return Ok(types);
        }
        let name = root_name.map(str::to_string).unwrap_or_else(|| file_stem(source));
        Ok(vec![self.generate(source, &name, container)?])
    }

    /// Number of distinct documents fetched so far.
    pub fn document_count(&self) -> usize {
        self.store.document_count()
    }
}

fn schema_files(dir: &Path) -> Result<Vec<PathBuf>, ResolutionError> {
    let origin = dir.display().to_string();
    let base = glob::Pattern::escape(&origin);
    let mut files = Vec::new();
    for extension in SCHEMA_EXTENSIONS {
        let pattern = format!("{}/*.{extension}", base.trim_end_matches('/'));
        let entries = glob::glob(&pattern).map_err(|e| ResolutionError::unresolvable(&origin, e))?;
        for entry in entries {
            files.push(entry.map_err(|e| ResolutionError::unresolvable(&origin, e))?);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(source: &str) -> String {
    let last = source
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source);
    let last = last.split(['#', '?']).next().unwrap_or(last);
    match last.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => last.to_string(),
    }
}

//! Reference resolution: URI in, parsed schema document out.
//!
//! [`BaseResolver`] does the actual fetch and parse. [`ContentResolver`]
//! decorates one with a [`ReferenceRewriter`]: every URI is rewritten first
//! and the base resolver only ever sees the rewritten location.
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ResolutionError;
use crate::node::SchemaNode;
use crate::rewrite::ReferenceRewriter;

pub trait BaseResolver: Send + Sync {
    /// Fetch and parse the document at `uri`. The returned node is the
    /// document root and carries `uri` as its identity.
    fn resolve(&self, uri: &str) -> Result<SchemaNode, ResolutionError>;
}

impl<R: BaseResolver + ?Sized> BaseResolver for Arc<R> {
    fn resolve(&self, uri: &str) -> Result<SchemaNode, ResolutionError> {
        (**self).resolve(uri)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEFAULT RESOLVER
// ————————————————————————————————————————————————————————————————————————————

/// Reads `file:` URLs from disk and `http`/`https` URLs over the network.
/// Documents ending in `.yaml`/`.yml` are parsed as YAML, everything else
/// as JSON.
#[derive(Debug, Default)]
pub struct DefaultResolver {
    http: Option<reqwest::blocking::Client>,
}

impl DefaultResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, headers).
    pub fn with_http_client(client: reqwest::blocking::Client) -> Self {
        Self { http: Some(client) }
    }

    fn fetch(&self, url: &Url) -> Result<String, ResolutionError> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ResolutionError::unresolvable(url.as_str(), "not a local file path"))?;
                std::fs::read_to_string(&path).map_err(|e| ResolutionError::unresolvable(url.as_str(), e))
            }
            "http" | "https" => {
                let response = match &self.http {
                    Some(client) => client.get(url.clone()).send(),
                    None => reqwest::blocking::get(url.clone()),
                };
                response
                    .and_then(|r| r.error_for_status())
                    .and_then(|r| r.text())
                    .map_err(|e| ResolutionError::unresolvable(url.as_str(), e))
            }
            other => Err(ResolutionError::unresolvable(
                url.as_str(),
                format!("unsupported scheme '{other}'"),
            )),
        }
    }
}

impl BaseResolver for DefaultResolver {
    fn resolve(&self, uri: &str) -> Result<SchemaNode, ResolutionError> {
        let url = to_url(uri)?;
        let mut document_url = url.clone();
        document_url.set_fragment(None);

        debug!(uri = %document_url, "fetching schema document");
        let source = self.fetch(&document_url)?;
        let document = parse_document(document_url.as_str(), &source)?;
        Ok(SchemaNode::new(document_url.as_str(), document))
    }
}

/// Parse schema text, picking YAML or JSON by the location's extension.
pub fn parse_document(uri: &str, source: &str) -> Result<Value, ResolutionError> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let is_yaml = path.ends_with(".yaml") || path.ends_with(".yml");
    let parsed = if is_yaml {
        serde_yaml::from_str::<Value>(source).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Value>(source).map_err(|e| e.to_string())
    };
    match parsed {
        Ok(value @ (Value::Object(_) | Value::Bool(_))) => Ok(value),
        Ok(other) => Err(ResolutionError::malformed(
            uri,
            format!("expected a schema object, found {}", kind_of(&other)),
        )),
        Err(reason) => Err(ResolutionError::malformed(uri, reason)),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accept either an absolute URL or a filesystem path. Existing directories
/// become `file:` URLs with a trailing slash so relative references join
/// underneath them.
pub fn to_url(reference: &str) -> Result<Url, ResolutionError> {
    match Url::parse(reference) {
        // single letter "schemes" are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => path_to_url(Path::new(reference)),
    }
}

pub fn path_to_url(path: &Path) -> Result<Url, ResolutionError> {
    let absolute = std::path::absolute(path)
        .map_err(|e| ResolutionError::unresolvable(path.display().to_string(), e))?;
    let url = if absolute.is_dir() {
        Url::from_directory_path(&absolute)
    } else {
        Url::from_file_path(&absolute)
    };
    url.map_err(|_| ResolutionError::unresolvable(path.display().to_string(), "not a valid file path"))
}

/// The local directory a source URL points at, if it is a `file:` URL of an
/// existing directory.
pub fn local_directory(source: &str) -> Option<Url> {
    let url = to_url(source).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    let path = url.to_file_path().ok()?;
    if !path.is_dir() {
        return None;
    }
    Url::from_directory_path(path).ok()
}

// ————————————————————————————————————————————————————————————————————————————
// MEMORY RESOLVER
// ————————————————————————————————————————————————————————————————————————————

/// Serves documents registered in memory, keyed by exact URI. Useful for
/// embedding generated schemas and for tests.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    documents: HashMap<String, Value>,
    requests: Mutex<Vec<String>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.insert(uri, document);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, document: Value) {
        self.documents.insert(uri.into(), document);
    }

    /// Every URI this resolver was asked for, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl BaseResolver for MemoryResolver {
    fn resolve(&self, uri: &str) -> Result<SchemaNode, ResolutionError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(uri.to_string());
        let key = uri.split('#').next().unwrap_or(uri);
        match self.documents.get(key) {
            Some(document) => Ok(SchemaNode::new(key, document.clone())),
            None => Err(ResolutionError::unresolvable(uri, "no such document")),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONTENT RESOLVER
// ————————————————————————————————————————————————————————————————————————————

/// Rewrites every URI through its [`ReferenceRewriter`] before handing it
/// to the base resolver. Results are returned unmodified.
pub struct ContentResolver {
    rewriter: ReferenceRewriter,
    base: Box<dyn BaseResolver>,
}

impl ContentResolver {
    pub fn new(rewriter: ReferenceRewriter, base: impl BaseResolver + 'static) -> Self {
        Self { rewriter, base: Box::new(base) }
    }

    /// Fresh rewrite table over the [`DefaultResolver`].
    pub fn with_default_base() -> Self {
        Self::new(ReferenceRewriter::new(), DefaultResolver::new())
    }

    pub fn rewriter(&self) -> &ReferenceRewriter {
        &self.rewriter
    }

    /// Where `uri` will actually be read from.
    pub fn locate(&self, uri: &str) -> String {
        self.rewriter.rewrite(uri)
    }

    pub fn resolve(&self, uri: &str) -> Result<SchemaNode, ResolutionError> {
        self.resolve_located(&self.locate(uri))
    }

    /// Fetch a location already produced by [`locate`](Self::locate).
    pub fn resolve_located(&self, location: &str) -> Result<SchemaNode, ResolutionError> {
        self.base.resolve(location)
    }

    /// Session setup hook: for each source that is a local directory,
    /// redirect `mirror_url` to it. With no mirror URL configured this does
    /// nothing. Returns how many entries were registered.
    pub fn register_local_mirrors<S: AsRef<str>>(&self, mirror_url: Option<&str>, sources: &[S]) -> usize {
        let Some(mirror_url) = mirror_url.filter(|u| !u.trim().is_empty()) else {
            debug!("no mirror url configured, references resolve as given");
            return 0;
        };
        // references are compared in their normalized url form
        let normalized = match Url::parse(mirror_url.trim()) {
            Ok(url) => url.to_string(),
            Err(_) => mirror_url.trim().to_string(),
        };
        let mirror_url = normalized.as_str();

        let mut registered = 0;
        for source in sources {
            let source = source.as_ref();
            let Some(dir) = local_directory(source) else {
                debug!(%source, "source is not a local directory, not mirroring");
                continue;
            };
            let mut replacement = dir.to_string();
            if !mirror_url.ends_with('/') {
                replacement.pop();
            }
            if registered > 0 {
                warn!(%mirror_url, %replacement, "several local directories mirror the same url, the last one wins");
            }
            info!(%mirror_url, %replacement, "resolving mirror url from local directory");
            self.rewriter.register(mirror_url, replacement);
            registered += 1;
        }
        registered
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("rewriter", &self.rewriter)
            .finish_non_exhaustive()
    }
}

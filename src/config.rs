//! Generation settings.
//!
//! Single-valued settings such as the mirror URL are looked up through an
//! ordered list of [`SettingProvider`]s; the first one with a non-empty
//! value answers. The standard order is the process environment, then the
//! property set (config file `properties` overlaid with `-D` arguments).
//!
//! Everything else lives in a [`GenerationConfig`] file.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::path_de;

/// Name of the setting holding the external base URL that local source
/// directories mirror.
pub const MIRROR_URL_KEY: &str = "json_schema_url";

// ————————————————————————————————————————————————————————————————————————————
// PROVIDERS
// ————————————————————————————————————————————————————————————————————————————

pub trait SettingProvider: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

impl SettingProvider for EnvProvider {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Process property set: explicit `key=value` pairs.
#[derive(Debug, Clone, Default)]
pub struct PropertyProvider {
    properties: IndexMap<String, String>,
}

impl PropertyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any earlier value.
    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Parse a `KEY=VALUE` definition. A bare `KEY` defines the empty string.
    pub fn define_pair(&mut self, pair: &str) {
        match pair.split_once('=') {
            Some((key, value)) => self.define(key.trim(), value.trim()),
            None => self.define(pair.trim(), ""),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyProvider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut provider = Self::new();
        for (key, value) in iter {
            provider.define(key, value);
        }
        provider
    }
}

impl SettingProvider for PropertyProvider {
    fn name(&self) -> &str {
        "properties"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SETTINGS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
pub struct Settings {
    providers: Vec<Box<dyn SettingProvider>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment first, then `properties`.
    pub fn standard(properties: PropertyProvider) -> Self {
        Self::new().with_provider(EnvProvider).with_provider(properties)
    }

    /// Append a provider with lower precedence than every existing one.
    pub fn with_provider(mut self, provider: impl SettingProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// First non-empty value for `key`, in provider order.
    pub fn get(&self, key: &str) -> Option<String> {
        for provider in &self.providers {
            match provider.lookup(key) {
                Some(value) if !value.trim().is_empty() => {
                    debug!(key, provider = provider.name(), "setting found");
                    return Some(value);
                }
                _ => {}
            }
        }
        debug!(key, "setting not set");
        None
    }

    pub fn mirror_url(&self) -> Option<String> {
        self.get(MIRROR_URL_KEY)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("Settings").field("providers", &names).finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONFIG FILE
// ————————————————————————————————————————————————————————————————————————————

/// Generation config file (JSON, or YAML by extension). Every field is
/// optional; command-line arguments take precedence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Schema files, directories, or URLs to generate from.
    pub sources: Vec<String>,
    pub root_type: Option<String>,
    pub out: Option<PathBuf>,
    /// Process property set entries.
    pub properties: IndexMap<String, String>,
    /// Extra prefix rewrites, registered in file order before mirrors.
    pub rewrites: IndexMap<String, String>,
    /// Carry every enumeration as a string regardless of its values.
    pub string_backed_enums: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            root_type: None,
            out: None,
            properties: IndexMap::new(),
            rewrites: IndexMap::new(),
            string_backed_enums: true,
        }
    }
}

impl GenerationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        if is_yaml {
            path_de::from_yaml_with_path(&origin, &text)
        } else {
            path_de::from_json_with_path(&origin, &text)
        }
    }
}

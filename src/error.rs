//! Error taxonomy.
//!
//! Rewriting and rule overrides are total, so every failure here starts in a
//! base resolver (fetch or parse) or in a schema the rules cannot make sense
//! of. Nothing is retried.
use thiserror::Error;

/// Failure to turn a reference into schema content.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The (rewritten) location could not be fetched: missing file,
    /// unreachable host, unsupported scheme, or a fragment that points nowhere.
    #[error("unresolvable reference '{uri}': {reason}")]
    Unresolvable {
        uri: String,
        reason: String,
    },

    /// The bytes were fetched but are not a schema document.
    #[error("malformed schema content at '{uri}': {reason}")]
    Malformed {
        uri: String,
        reason: String,
    },
}

impl ResolutionError {
    pub fn unresolvable(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unresolvable { uri: uri.into(), reason: reason.to_string() }
    }

    pub fn malformed(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed { uri: uri.into(), reason: reason.to_string() }
    }

    /// The location the failure refers to.
    pub fn uri(&self) -> &str {
        match self {
            Self::Unresolvable { uri, .. } | Self::Malformed { uri, .. } => uri,
        }
    }
}

/// Failure while applying rules to a schema tree.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The schema is well-formed JSON but cannot be turned into a type.
    #[error("invalid schema at '{location}': {reason}")]
    InvalidSchema {
        location: String,
        reason: String,
    },

    /// A `$ref` chain loops back on itself without passing through an object.
    #[error("circular reference through '{location}'")]
    CircularReference {
        location: String,
    },
}

/// Failure loading a generation config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {reason}")]
    Parse {
        path: String,
        reason: String,
    },
}

//! Rust type generation from JSON Schema, with reference rewriting to local
//! schema mirrors and overridable generation rules.
pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod generator;
pub mod ir;
pub mod naming;
pub mod node;
pub mod path_de;
pub mod resolve;
pub mod rewrite;
pub mod rules;
pub mod store;

pub use error::{ConfigError, GenerateError, ResolutionError};
pub use generator::Generator;
pub use resolve::{BaseResolver, ContentResolver};
pub use rewrite::ReferenceRewriter;
pub use rules::{Rule, RuleKind, RuleOverride, RuleRegistry};

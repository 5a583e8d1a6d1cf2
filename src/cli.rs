//! Command line: generate Rust types from JSON Schema, or show how a single
//! reference resolves.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::codegen::Codegen;
use crate::config::{GenerationConfig, PropertyProvider, Settings};
use crate::generator::Generator;
use crate::ir::TypeContainer;
use crate::resolve::ContentResolver;
use crate::rules::RuleRegistry;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate strict Rust data types from JSON Schema documents
#[derive(Parser, Debug)]
#[command(name = "schemagen", version, about)]
pub struct CommandLineInterface {
    /// more log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate Rust types for every source schema
    Generate(GenerateOut),
    /// print where a reference is read from and the document found there
    Resolve(ResolveOut),
}

#[derive(Args, Debug, Clone)]
struct SessionSettings {
    /// Schema sources: files, directories, URLs, or quoted glob patterns.
    /// Local directories are mirrors for `json_schema_url`.
    #[arg(long, short, num_args = 1..)]
    source: Vec<String>,

    /// define a process property, e.g. -D json_schema_url=https://example.org/schemas/
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    define: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    session: SessionSettings,

    /// JSON or YAML generation config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rust type name for a single root schema (default: the file stem)
    #[arg(long)]
    root_type: Option<String>,

    /// output .rs file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// back enums by the primitive their values share instead of String
    #[arg(long, default_value_t = false)]
    infer_enum_types: bool,
}

#[derive(clap::Parser, Debug)]
struct ResolveOut {
    /// reference to resolve
    uri: String,

    #[command(flatten)]
    session: SessionSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SessionSettings {
    /// `base` properties overlaid with the `-D` definitions.
    fn settings(&self, base: &indexmap::IndexMap<String, String>) -> Settings {
        let mut properties: PropertyProvider = base.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        for pair in &self.define {
            properties.define_pair(pair);
        }
        Settings::standard(properties)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => target.run(),
            Command::Resolve(target) => target.run(),
        }
    }
}

impl GenerateOut {
    fn run(&self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => GenerationConfig::load(path)?,
            None => GenerationConfig::default(),
        };
        let settings = self.session.settings(&config.properties);
        let mirror_url = settings.mirror_url();

        let patterns = config.sources.iter().chain(&self.session.source);
        let sources = resolve_source_patterns(patterns).context("failed to resolve sources")?;
        if sources.is_empty() {
            bail!("no sources given (use --source or a config file)");
        }

        let rules = if config.string_backed_enums && !self.infer_enum_types {
            RuleRegistry::string_backed_enums()
        } else {
            RuleRegistry::standard()
        };
        let mut generator = Generator::new(rules, ContentResolver::with_default_base());
        generator.register_rewrites(config.rewrites.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let mirrors = generator.setup(&sources, mirror_url.as_deref());
        if let Some(url) = &mirror_url {
            eprintln!("{} {url} ({mirrors} local)", "mirror".cyan().bold());
        }

        let root_type = self.root_type.as_deref().or(config.root_type.as_deref());
        let root_type = if sources.len() == 1 { root_type } else { None };
        let mut container = TypeContainer::new();
        for source in &sources {
            generator
                .generate_source(source, root_type, &mut container)
                .with_context(|| format!("failed to generate types for {source}"))?;
            eprintln!("{} {source}", "generated".green().bold());
        }

        let mut cg = Codegen::new();
        cg.emit(&container);
        let rust_src = cg.into_string();

        match self.out.as_ref().or(config.out.as_ref()) {
            Some(out) => {
                write_output(out, &rust_src)?;
                eprintln!(
                    "{} {} declarations → {}",
                    "wrote".green().bold(),
                    container.len(),
                    out.display()
                );
            }
            None => println!("{rust_src}"),
        }
        Ok(())
    }
}

impl ResolveOut {
    fn run(&self) -> anyhow::Result<()> {
        let settings = self.session.settings(&Default::default());
        let sources = resolve_source_patterns(&self.session.source).context("failed to resolve sources")?;

        let resolver = ContentResolver::with_default_base();
        resolver.register_local_mirrors(settings.mirror_url().as_deref(), &sources);

        let location = resolver.locate(&self.uri);
        if location != self.uri {
            eprintln!("{} {} → {location}", "rewrote".cyan().bold(), self.uri);
        }
        let node = resolver
            .resolve(&self.uri)
            .with_context(|| format!("failed to resolve {}", self.uri))?;
        println!("{}", serde_json::to_string_pretty(node.value())?);
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Expand quoted glob patterns; anything else (paths, URLs) passes through.
fn resolve_source_patterns<I>(patterns: I) -> anyhow::Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<String>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) && !pattern.contains("://") {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?.display().to_string());
                matched_any = true;
            }
            if !matched_any {
                // explicit glob that matched nothing
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(pattern.to_string());
        }
    }

    Ok(out)
}

fn write_output(out: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

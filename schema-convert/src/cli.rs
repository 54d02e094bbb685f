use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "schema-convert")]
#[command(about = "Convert resource configuration to and from canonical API documents")]
pub struct Cli {
    /// Extra schema definitions (*.toml) loaded on top of the built-in ones.
    #[arg(long, global = true)]
    pub schemas_dir: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Expand a configuration file into a canonical document.
    Expand(ExpandArgs),
    /// Flatten a canonical document into a configuration tree.
    Flatten(FlattenArgs),
    /// Round-trip one configuration against its exported document.
    Roundtrip(RoundtripArgs),
    /// Round-trip every case of a batch manifest in parallel.
    Batch(BatchArgs),
    /// Compare two configuration files.
    Diff(DiffArgs),
    /// List schemas, or show one schema's descriptor tree.
    Schemas(SchemasArgs),
    /// List equivalence predicate families, or one schema's bindings.
    Predicates(PredicatesArgs),
}

#[derive(Parser, Debug)]
pub struct ExpandArgs {
    /// Schema name or canonical asset type.
    pub schema: String,
    /// Configuration file (JSON).
    pub config: PathBuf,
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct FlattenArgs {
    /// Schema name or canonical asset type.
    pub schema: String,
    /// Canonical document, or an assets file when --address is given.
    pub document: PathBuf,
    /// Pick this asset out of an assets file.
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct RoundtripArgs {
    /// Schema name or canonical asset type.
    pub schema: String,
    /// Raw configuration file (JSON).
    pub config: PathBuf,
    /// Assets file holding the exported document.
    pub assets: PathBuf,
    /// Asset to compare against. Defaults to the configuration's `name`.
    #[arg(long)]
    pub address: Option<String>,
    /// Configuration paths not represented in the canonical document.
    #[arg(long)]
    pub ignore: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Manifest file (TOML) listing `[[case]]` entries.
    pub manifest: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub file1: PathBuf,
    pub file2: PathBuf,
    /// Coerce both files against this schema before comparing.
    #[arg(long)]
    pub schema: Option<String>,
    #[arg(long)]
    pub ignore: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[arg(long)]
    pub summary: bool,
}

#[derive(Parser, Debug)]
pub struct SchemasArgs {
    /// Show this schema's descriptor tree.
    pub name: Option<String>,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct PredicatesArgs {
    /// Show the patterns bound in this schema's registry.
    #[arg(long)]
    pub schema: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

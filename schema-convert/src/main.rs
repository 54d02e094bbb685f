use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use schema_convert::asset::{DocumentSource, FileDocumentSource};
use schema_convert::catalog::{SchemaCatalog, SchemaEntry};
use schema_convert::coerce::conform;
use schema_convert::equivalence::families;
use schema_convert::harness::{load_manifest, run_batch};
use schema_convert::inspect::render_schema;
use schema_convert::report::{
    render_batch, render_bindings, render_families, render_round_trip, render_summary,
    render_text, render_warnings,
};
use serde_json::{json, Value as Json};
use tracing_subscriber::EnvFilter;
use value_tree_core::{
    diff_with_options, fields_to_json, format_json, parse_file, write_file, DiffOptions, Fields,
};

mod cli;
mod path_guard;

use cli::{
    BatchArgs, Cli, Command, DiffArgs, ExpandArgs, FlattenArgs, OutputFormat, PredicatesArgs,
    RoundtripArgs, SchemasArgs,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let catalog = load_catalog(cli.schemas_dir.as_deref())?;

    match cli.command {
        Command::Expand(args) => run_expand(&catalog, args),
        Command::Flatten(args) => run_flatten(&catalog, args),
        Command::Roundtrip(args) => run_roundtrip(&catalog, args),
        Command::Batch(args) => run_batch_cmd(&catalog, args),
        Command::Diff(args) => run_diff(&catalog, args),
        Command::Schemas(args) => run_schemas(&catalog, args),
        Command::Predicates(args) => run_predicates(&catalog, args),
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(schemas_dir: Option<&Path>) -> Result<SchemaCatalog> {
    let mut catalog = SchemaCatalog::builtin().context("failed to load built-in schemas")?;
    if let Some(dir) = schemas_dir {
        catalog
            .load_dir(dir)
            .with_context(|| format!("failed to load schemas from {}", dir.display()))?;
    }
    Ok(catalog)
}

fn resolve<'a>(catalog: &'a SchemaCatalog, name: &str) -> Result<&'a SchemaEntry> {
    catalog.resolve(name).with_context(|| {
        format!(
            "unknown schema '{name}' (known: {})",
            catalog.names().join(", ")
        )
    })
}

fn read_config(path: &Path) -> Result<Fields> {
    parse_file(path).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_document(path: &Path, address: Option<&str>) -> Result<Json> {
    match address {
        Some(address) => {
            let assets = FileDocumentSource::open(path)?;
            let asset = assets.fetch(address)?;
            Ok(asset.document()?.clone())
        }
        None => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))
        }
    }
}

fn run_expand(catalog: &SchemaCatalog, args: ExpandArgs) -> Result<()> {
    let entry = resolve(catalog, &args.schema)?;
    let config = read_config(&args.config)?;
    let document = entry
        .expand(&config)
        .with_context(|| format!("failed to expand {}", args.config.display()))?;
    let mut rendered = serde_json::to_string_pretty(&document)?;
    rendered.push('\n');

    match args.output {
        Some(out_path) => {
            path_guard::ensure_output_not_same(&out_path, &[&args.config])?;
            fs::write(&out_path, rendered)
                .with_context(|| format!("failed to write {}", out_path.display()))?;
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_flatten(catalog: &SchemaCatalog, args: FlattenArgs) -> Result<()> {
    let entry = resolve(catalog, &args.schema)?;
    let document = read_document(&args.document, args.address.as_deref())?;
    let flattened = entry
        .flatten(&document)
        .with_context(|| format!("failed to flatten {}", args.document.display()))?;

    if let Some(out_path) = &args.output {
        path_guard::ensure_output_not_same(out_path, &[&args.document])?;
        write_file(&flattened.config, out_path)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
    }

    match args.format {
        OutputFormat::Text => {
            if args.output.is_none() {
                println!("{}", serde_json::to_string_pretty(&fields_to_json(&flattened.config))?);
            }
            if !flattened.warnings.is_empty() {
                eprintln!("{}", render_warnings(&flattened.warnings));
            }
        }
        OutputFormat::Json => {
            let report = json!({
                "config": fields_to_json(&flattened.config),
                "warnings": flattened.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn run_roundtrip(catalog: &SchemaCatalog, args: RoundtripArgs) -> Result<()> {
    let entry = resolve(catalog, &args.schema)?;
    let raw = read_config(&args.config)?;
    let address = match &args.address {
        Some(address) => address.clone(),
        None => match raw.get("name").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None => bail!(
                "{} has no name; pass --address to pick an asset",
                args.config.display()
            ),
        },
    };
    let document = read_document(&args.assets, Some(&address))?;

    let report = entry
        .round_trip(&raw, &document, &args.ignore)
        .with_context(|| format!("round trip of {address} aborted"))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_round_trip(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.passed() {
        bail!(
            "round trip failed: {} export divergences, {} stability differences",
            report.divergences.len(),
            report.stability_diff.len()
        );
    }
    Ok(())
}

fn run_batch_cmd(catalog: &SchemaCatalog, args: BatchArgs) -> Result<()> {
    let cases = load_manifest(&args.manifest)?;
    let report = run_batch(catalog, &cases);

    match args.format {
        OutputFormat::Text => println!("{}", render_batch(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.all_passed() {
        bail!("{} of {} cases failed", report.failed(), report.results.len());
    }
    Ok(())
}

fn run_diff(catalog: &SchemaCatalog, args: DiffArgs) -> Result<()> {
    let mut left = read_config(&args.file1)?;
    let mut right = read_config(&args.file2)?;

    if let Some(name) = &args.schema {
        let entry = resolve(catalog, name)?;
        left = conform(&entry.schema, &left)
            .with_context(|| format!("{} does not match {name}", args.file1.display()))?;
        right = conform(&entry.schema, &right)
            .with_context(|| format!("{} does not match {name}", args.file2.display()))?;
    }

    let opts = DiffOptions {
        ignore_paths: args.ignore,
        ..DiffOptions::default()
    };
    let entries = diff_with_options(&left, &right, &opts);

    if args.summary {
        println!("{}", render_summary(&entries));
        return Ok(());
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_text(&entries)),
        OutputFormat::Json => println!("{}", format_json(&entries)),
    }
    Ok(())
}

fn run_schemas(catalog: &SchemaCatalog, args: SchemasArgs) -> Result<()> {
    if let Some(name) = &args.name {
        let entry = resolve(catalog, name)?;
        match args.format {
            OutputFormat::Text => print!("{}", render_schema(&entry.schema, args.depth)),
            OutputFormat::Json => {
                let fields: Vec<Json> = entry
                    .schema
                    .descriptors()
                    .into_iter()
                    .filter(|fd| !fd.name.is_empty())
                    .map(|fd| {
                        json!({
                            "path": fd.path,
                            "kind": fd.kind.label(),
                            "wire": fd.wire_display(),
                            "computed": fd.computed,
                            "required": fd.required,
                            "default": fd.default,
                            "equivalence": fd.equivalence,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&fields)?);
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Text => {
            for entry in catalog.iter() {
                println!(
                    "{} asset_type={} fields={} predicates={}",
                    entry.name(),
                    entry.schema.asset_type,
                    entry.schema.fields().len(),
                    entry.registry.len()
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Json> = catalog
                .iter()
                .map(|entry| {
                    json!({
                        "name": entry.name(),
                        "asset_type": entry.schema.asset_type,
                        "fields": entry.schema.fields().len(),
                        "predicates": entry.registry.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn run_predicates(catalog: &SchemaCatalog, args: PredicatesArgs) -> Result<()> {
    match &args.schema {
        Some(name) => {
            let entry = resolve(catalog, name)?;
            println!("{}", render_bindings(&entry.registry));
        }
        None => println!("{}", render_families(&families())),
    }
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use ccpp_schema_core::{ResolvedSchema, Routine, SchemaArtifact, colon_dimensions};
use ccpp_schema_meta::{MetadataLoader, ResolverConfig, fingerprint};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "ccpp-meta")]
#[command(about = "Resolve and inspect CCPP physics metadata directories")]
struct Cli {
    /// Log resolution steps to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a metadata directory into a schema artifact.
    Resolve(ResolveArgs),
    /// Print the standard name to local name table.
    Names(LoadArgs),
    /// List every routine with its caller-supplied arguments.
    Routines(LoadArgs),
    /// Resolve a directory and report a summary without writing anything.
    Check(LoadArgs),
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Directory containing metadata files.
    dir: PathBuf,
    /// Resolver configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Output file; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Resolve(args) => run_resolve(args),
        Command::Names(args) => run_names(args),
        Command::Routines(args) => run_routines(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_schema(args: &LoadArgs) -> Result<ResolvedSchema, String> {
    let config = match &args.config {
        Some(path) => ResolverConfig::load(path).map_err(|e| e.to_string())?,
        None => ResolverConfig::default(),
    };
    debug!(dir = %args.dir.display(), ?config, "Loading metadata");
    MetadataLoader::new(config)
        .load_dir(&args.dir)
        .map_err(|e| e.to_string())
}

fn run_resolve(args: ResolveArgs) -> Result<(), String> {
    let schema = load_schema(&args.load)?;
    let digest = fingerprint(&schema.metadata).map_err(|e| e.to_string())?;
    let artifact = SchemaArtifact::new(schema.metadata, chrono::Utc::now().to_rfc3339())
        .with_fingerprint(digest);

    let raw = render(&artifact, args.format)?;
    match &args.output {
        Some(path) => {
            write_file(path, &raw)?;
            println!(
                "Resolved {} scheme(s) into '{}'.",
                artifact.scheme_count(),
                path.display()
            );
        }
        None => print!("{raw}"),
    }
    Ok(())
}

fn run_names(args: LoadArgs) -> Result<(), String> {
    let schema = load_schema(&args)?;
    for (standard_name, name) in schema.names.iter() {
        println!("{standard_name}\t{name}");
    }
    Ok(())
}

fn run_routines(args: LoadArgs) -> Result<(), String> {
    let schema = load_schema(&args)?;
    for routine in schema.metadata.iterate_routines() {
        println!("{}", describe_routine(routine));
    }
    Ok(())
}

fn run_check(args: LoadArgs) -> Result<(), String> {
    let schema = load_schema(&args)?;
    let metadata = &schema.metadata;
    let digest = fingerprint(metadata).map_err(|e| e.to_string())?;
    println!(
        "{} scheme(s), {} module(s), {} type(s), {} standard name(s).",
        metadata.schemes().len(),
        metadata.modules().len(),
        metadata.types().len(),
        schema.names.len()
    );
    println!("fingerprint: {digest}");
    Ok(())
}

/// `foo_run(x: integer [in], t: real(kind=kind_phys)(:) [inout])`
fn describe_routine(routine: &Routine) -> String {
    let args: Vec<String> = routine
        .declared_args()
        .map(|arg| {
            format!(
                "{}: {}{} [{}{}]",
                arg.name,
                arg.arg_type.type_string(arg.kind.as_deref()),
                colon_dimensions(&arg.dimensions),
                arg.intent,
                if arg.optional { ", optional" } else { "" }
            )
        })
        .collect();
    format!("{}({})", routine.name, args.join(", "))
}

fn render<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|raw| raw + "\n")
            .map_err(|err| format!("Failed to serialize JSON: {err}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|err| format!("Failed to serialize YAML: {err}"))
        }
    }
}

fn write_file(path: &Path, raw: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    fs::write(path, raw).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}

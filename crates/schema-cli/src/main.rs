//! # schema-cli
//!
//! Command-line interface for resolving schema definition sets and comparing
//! resolved schemas.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::CliConfig;
use schema_diff::{ToleratedPaths, diff_objects, format_differences, summary};
use schema_resolve::{ResolveOptions, SchemaResolver, read_object_file};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemac")]
#[command(about = "Schema extension and patch resolver")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema directory with its extensions and print it as JSON
    Resolve {
        /// Base schema directory
        schema_dir: PathBuf,

        /// Extension directory, applied in the order given
        #[arg(short, long = "extension")]
        extensions: Vec<PathBuf>,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep hidden classes and objects
        #[arg(long)]
        include_hidden: bool,
    },

    /// Compare two resolved schema files
    Diff {
        /// Left (expected) file
        left: PathBuf,

        /// Right (actual) file
        right: PathBuf,

        /// Regex over the dot-joined path of differences to tolerate
        #[arg(short, long = "tolerate")]
        tolerated: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    match cli.command {
        Commands::Resolve {
            schema_dir,
            extensions,
            output,
            include_hidden,
        } => {
            let config = config.merge_flags(extensions, include_hidden, Vec::new());
            resolve(&schema_dir, &config, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Diff {
            left,
            right,
            tolerated,
        } => {
            let config = config.merge_flags(Vec::new(), false, tolerated);
            diff(&left, &right, &config)
        }
    }
}

fn resolve(schema_dir: &Path, config: &CliConfig, output: Option<&Path>) -> anyhow::Result<()> {
    tracing::info!("Resolving {:?}", schema_dir);

    let mut resolver = SchemaResolver::new(schema_dir).with_options(ResolveOptions {
        include_hidden: config.include_hidden,
    });
    for extension in &config.extensions {
        resolver.add_extension(extension.clone());
    }

    let resolved = resolver
        .resolve()
        .with_context(|| format!("Failed to resolve schema {}", schema_dir.display()))?;
    let mut json = schema_json::to_pretty_string(&resolved.into_value())?;
    json.push('\n');

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote resolved schema to {:?}", path);
        }
        None => print!("{json}"),
    }
    Ok(())
}

fn diff(left: &Path, right: &Path, config: &CliConfig) -> anyhow::Result<ExitCode> {
    tracing::info!("Comparing {:?} with {:?}", left, right);

    let policy = ToleratedPaths::new(&config.tolerated)?;
    let left_obj = read_object_file(left).context("Failed to read left file")?;
    let right_obj = read_object_file(right).context("Failed to read right file")?;

    let outcome = diff_objects(&left_obj, &right_obj, Some(&policy));
    if !outcome.is_identical() {
        println!("{}", format_differences(&outcome.differences));
    }
    eprintln!("{}", summary(&outcome));

    Ok(if outcome.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

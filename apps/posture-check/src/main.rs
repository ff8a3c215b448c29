#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! posture-check - controller security posture conventions
//!
//! Discovers catalog manifests, resolves the authorization posture of every
//! controller and action, and compares deviations against the
//! acknowledgement ledger.
//!
//! Exit codes: `0` all rules pass, `1` convention failures, `2` load or
//! configuration errors.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use posture_conventions::{Manifest, ScannedModule};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod output;
mod scanner;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Check controller security posture conventions
#[derive(Parser, Debug)]
#[command(name = "posture-check")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Manifest files or directories to scan
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Dedicated acknowledgement ledger file
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Glob patterns to exclude (matched against path and file name)
    #[arg(long)]
    exclude: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Log scanning and rule evaluation to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Load the manifests of a run, each paired with its canonical path.
///
/// Walked files without manifest keys are skipped; files named on the
/// command line and the ledger are decoded strictly. The configuration
/// file is never read as a manifest.
fn load_run_manifests(cli: &Cli) -> Result<Vec<(PathBuf, Manifest)>> {
    let config_path = cli.config.as_deref().map(scanner::canonical);
    let ledger_path = match &cli.ledger {
        Some(ledger) if !ledger.is_file() => {
            bail!("ledger file not found: {}", ledger.display());
        }
        Some(ledger) => Some(scanner::canonical(ledger)),
        None => None,
    };

    let mut manifests = Vec::new();
    for candidate in scanner::find_manifests(&cli.paths, &cli.exclude) {
        let path = candidate.path;
        if config_path.as_ref() == Some(&path) || ledger_path.as_ref() == Some(&path) {
            continue;
        }
        let manifest = if candidate.explicit {
            Some(Manifest::load(&path)?)
        } else {
            Manifest::load_candidate(&path)?
        };
        match manifest {
            Some(manifest) => manifests.push((path, manifest)),
            None => tracing::info!(path = %path.display(), "skipping file without manifest keys"),
        }
    }
    if let Some(path) = ledger_path {
        let ledger = Manifest::load(&path)?;
        manifests.push((path, ledger));
    }
    Ok(manifests)
}

/// Load and check; `Ok(false)` means at least one rule failed.
fn run(cli: &Cli) -> Result<bool> {
    let config = config::load(cli.config.as_deref())?;

    let manifests = load_run_manifests(cli).context("failed to load manifests")?;
    if manifests.is_empty() {
        bail!("no manifest files found");
    }
    let files = manifests.len();
    tracing::info!(files, "manifests loaded");

    let module = ScannedModule::from_manifests(manifests).context("failed to load manifests")?;
    let report = module.check(&config);

    match cli.format {
        OutputFormat::Text => println!("{}", output::render_text(&report, files)),
        OutputFormat::Json => println!("{}", output::render_json(&report, files)?),
    }
    Ok(report.passed())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

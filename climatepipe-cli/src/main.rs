//! climatepipe CLI — run the ETL pipeline and inspect the output store.
//!
//! Commands:
//! - `run` — fetch, transform, and load every configured dataset suite
//!   (the default when no subcommand is given)
//! - `show` — list tables and row counts in an existing output store
//!
//! Progress lines go to stdout; diagnostics go to stderr; the process exits
//! non-zero on any stage failure.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use climatepipe_core::source::{Credentials, HttpFetcher};
use climatepipe_core::SqliteStore;
use climatepipe_runner::{run_suites, PipelineConfig, RunDeps, StdoutProgress};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "climatepipe",
    about = "Climate dataset ETL: fetch, clean, and load into SQLite"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, transform, and load the configured dataset suites.
    Run {
        /// Path to a TOML config file. Without it, paths come from the
        /// environment (CLIMATEPIPE_CONFIG_DIR, CLIMATEPIPE_STAGING_DIR,
        /// CLIMATEPIPE_DATA_DIR) with documented defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Suite to run (repeatable). Defaults to the configured list.
        #[arg(long)]
        suite: Vec<String>,
    },
    /// List tables and row counts in an existing output store.
    Show {
        /// Path of the SQLite store. Defaults to the configured output path.
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {
        config: None,
        suite: Vec::new(),
    }) {
        Commands::Run { config, suite } => run_cmd(config, suite),
        Commands::Show { store } => show_cmd(store),
    }
}

fn run_cmd(config_path: Option<PathBuf>, suite_args: Vec<String>) -> Result<()> {
    let config = match config_path {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::from_env(),
    };
    let suites = if suite_args.is_empty() {
        config.suites.clone()
    } else {
        suite_args
    };

    // Credentials are optional here: only hosted-dataset suites need them,
    // and the extractor reports a precise error if one runs without them.
    let credentials_path = config.config_dir.join(Credentials::FILE_NAME);
    let credentials = if credentials_path.exists() {
        Some(Credentials::from_config_dir(&config.config_dir)?)
    } else {
        None
    };

    let fetcher = HttpFetcher::new();
    let deps = RunDeps {
        fetcher: &fetcher,
        credentials,
        api_base: None,
        progress: &StdoutProgress,
    };

    match run_suites(&suites, &config, &deps) {
        Ok(report) => {
            for dataset in &report.datasets {
                println!(
                    "  {:<16} -> {:<18} {:>6} rows  {}",
                    dataset.name,
                    dataset.table,
                    dataset.rows_loaded,
                    &dataset.content_hash[..12]
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}

fn show_cmd(store_path: Option<PathBuf>) -> Result<()> {
    let store_path = store_path.unwrap_or_else(|| PipelineConfig::from_env().output_path);
    if !store_path.exists() {
        bail!("no store at {} — run the pipeline first", store_path.display());
    }

    let store = SqliteStore::open(&store_path)?;
    let names = store.table_names()?;
    if names.is_empty() {
        println!("Store {} contains no tables.", store_path.display());
        return Ok(());
    }

    println!("Store: {}", store_path.display());
    println!("{:<24} {:>10}", "Table", "Rows");
    println!("{}", "-".repeat(35));
    for name in &names {
        println!("{:<24} {:>10}", name, store.row_count(name)?);
    }

    Ok(())
}

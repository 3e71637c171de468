//! `saleradar` — operator CLI wiring `Config` through to the full
//! ingest → extract → merge → digest pipeline. A `#[derive(Subcommand)]`
//! enum and a `main()` that maps `anyhow::Error` to a process exit code
//! rather than panicking.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use saleradar_cli::commands;

#[derive(Parser)]
#[command(name = "saleradar", about = "Promotional offer ingestion and digest pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write starter `stores.yaml` and `preferences.yaml` if missing
    Seed,
    /// Run pending database migrations
    Init,
    /// Load `stores.yaml` into the database
    SyncStores,
    /// Run the daily ingest/extract/merge/digest pipeline
    Run {
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the weekly digest pipeline
    Weekly {
        #[arg(long)]
        dry_run: bool,
    },
    /// Source catalog inspection
    #[command(subcommand)]
    Sources(SourcesCommand),
    /// Store catalog inspection
    #[command(subcommand)]
    Stores(StoresCommand),
    /// Print the latest run of each run type
    Status,
}

#[derive(Subcommand)]
enum SourcesCommand {
    /// Parse `stores.yaml` and report configuration errors
    Validate,
    /// Run one store's source once and print the raw `SourceResult`
    Debug { store_slug: String, source_type: String },
    /// Per-store source health (last success, failure count)
    Report,
}

#[derive(Subcommand)]
enum StoresCommand {
    /// List all stores in the database
    List,
    /// Search stores by slug or name
    Search { query: String },
    /// Print the digest store allowlist from preferences.yaml
    Allowlist,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    saleradar_common::init_tracing();

    let runtime = match tokio::runtime::Runtime::new().context("building tokio runtime") {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = saleradar_common::Config::from_env().context("loading configuration")?;
    config.log_redacted();

    match cli.command {
        Commands::Seed => commands::seed(&config),
        Commands::Init => commands::init(&config).await,
        Commands::SyncStores => commands::sync_stores(&config).await,
        Commands::Run { dry_run } => commands::run_daily(&config, dry_run).await,
        Commands::Weekly { dry_run } => commands::run_weekly(&config, dry_run).await,
        Commands::Sources(SourcesCommand::Validate) => commands::sources_validate(&config),
        Commands::Sources(SourcesCommand::Debug { store_slug, source_type }) => {
            commands::sources_debug(&config, &store_slug, &source_type).await
        }
        Commands::Sources(SourcesCommand::Report) => commands::sources_report(&config).await,
        Commands::Stores(StoresCommand::List) => commands::stores_list(&config).await,
        Commands::Stores(StoresCommand::Search { query }) => commands::stores_search(&config, &query).await,
        Commands::Stores(StoresCommand::Allowlist) => commands::stores_allowlist(&config),
        Commands::Status => commands::status(&config).await,
    }
}

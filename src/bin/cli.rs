//! lotwatch CLI
//!
//! Local execution entry point for the scheduled watch run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lotwatch::{
    error::Result,
    models::Config,
    pipeline,
    storage::{LocalStorage, SnapshotStorage},
};

/// lotwatch - catalog listing watcher
#[derive(Parser, Debug)]
#[command(name = "lotwatch", version, about = "Watches catalog APIs for new listings and price changes")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "lotwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one watch cycle: crawl, diff, export, notify, persist
    Run,

    /// Validate the configuration file
    Validate,

    /// Show current snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);

    // Credentials may live outside the config file.
    if config.notify.token.is_empty() {
        if let Ok(token) = std::env::var("LOTWATCH_BOT_TOKEN") {
            config.notify.token = token;
        }
    }

    match cli.command {
        Command::Run => {
            config.validate()?;
            log::info!("Watching {} sources", config.sources.len());

            let storage = LocalStorage::new(&config.storage.snapshot_path);
            let summary = pipeline::run_watch(&config, &storage).await?;

            for (slug, detail) in &summary.failures {
                log::warn!("Source '{}' failed this run: {}", slug, detail);
            }
            log::info!(
                "Summary: {} ok / {} failed sources, {} listings, {} new, {} changed, {} removed, {} records skipped",
                summary.sources_ok,
                summary.sources_failed,
                summary.listing_count,
                summary.new_count,
                summary.changed_count,
                summary.removed_count,
                summary.skipped_records
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!(
                "Config OK: {} sources, snapshot at {}",
                config.sources.len(),
                config.storage.snapshot_path
            );
        }

        Command::Info => {
            let storage = LocalStorage::new(&config.storage.snapshot_path);
            let snapshot = storage.load().await;
            if snapshot.is_empty() {
                log::info!("No snapshot found yet.");
            } else {
                log::info!("Snapshot: {} listings", snapshot.len());
                let mut per_source = std::collections::BTreeMap::new();
                for listing in snapshot.listings() {
                    *per_source.entry(listing.source.as_str()).or_insert(0usize) += 1;
                }
                for (source, count) in per_source {
                    log::info!("  {}: {} listings", source, count);
                }
            }
        }
    }

    Ok(())
}

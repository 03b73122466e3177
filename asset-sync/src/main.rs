//! Asset Sync - Main entry point
//!
//! Uploads a static asset directory to S3, skipping files the bucket already has.

use anyhow::{Context, Result};
use asset_sync::{config::Config, transfer::S3Store, utils, SyncExecutor};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to sync
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    }
    .with_env_overrides()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting asset-sync v{} (bucket: {}, region: {})",
        env!("CARGO_PKG_VERSION"),
        config.storage.bucket,
        config.storage.region
    );

    if !args.root.is_dir() {
        anyhow::bail!("{} is not a directory", args.root.display());
    }

    let store = S3Store::connect(&config.storage).await;
    let report = SyncExecutor::new(&store, &config)
        .execute(&args.root)
        .await
        .with_context(|| format!("sync of {} failed", args.root.display()))?;

    if report.is_clean() {
        tracing::info!("Sync complete: {}", report);
    } else {
        tracing::warn!("Sync finished with errors: {}", report);
    }

    Ok(())
}

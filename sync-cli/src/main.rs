//! # docsync
//!
//! CLI tool for inspecting docsync caches.
//!
//! ## Commands
//!
//! - `status`: Show what the cache file holds
//! - `pending`: List queued writes
//! - `clear`: Delete the cache file
//! - `demo`: Run an offline round trip against an in-memory remote
//!
//! ## Example
//!
//! ```bash
//! # Queue a write while "offline" and leave it in the cache
//! docsync demo --stay-offline
//!
//! # Inspect it
//! docsync status
//! docsync pending --json
//!
//! # Start over
//! docsync clear
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsync_client::Settings;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{clear, demo, pending, status};

/// Cache file name inside the data directory.
const CACHE_FILE: &str = "document.cache";

/// CLI tool for inspecting docsync caches.
#[derive(Parser, Debug)]
#[command(name = "docsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding the cache file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show what the cache file holds
    Status,

    /// List queued writes, oldest first
    Pending {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the cache file
    Clear,

    /// Run an offline round trip against an in-memory remote
    Demo {
        /// Document id to log in with
        #[arg(long, default_value = "demo-user")]
        id: String,

        /// Leave the queued write in the cache instead of reconnecting
        #[arg(long)]
        stay_offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path).context("Failed to load settings")?,
        None => Settings::default(),
    };

    let cache_path = resolve_cache_path(cli.data_dir.as_deref(), &settings)?;

    tracing::debug!("Using cache file {}", cache_path.display());

    match cli.command {
        Commands::Status => {
            status::run(&cache_path, &settings.sync).await?;
        }
        Commands::Pending { json } => {
            pending::run(&cache_path, json).await?;
        }
        Commands::Clear => {
            clear::run(&cache_path).await?;
        }
        Commands::Demo { id, stay_offline } => {
            demo::run(&cache_path, settings.sync, &id, stay_offline).await?;
        }
    }

    Ok(())
}

/// Pick the cache file: `--data-dir` wins over the settings file, which wins
/// over the platform data directory.
fn resolve_cache_path(data_dir: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    match (data_dir, &settings.cache.path) {
        (Some(dir), _) => Ok(dir.join(CACHE_FILE)),
        (None, Some(path)) => Ok(path.clone()),
        (None, None) => Ok(default_data_dir()?.join(CACHE_FILE)),
    }
}

/// Get the default data directory for docsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "docsync", "docsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

//! Vault Resources - per-note resource folders for a markdown vault
//!
//! Watches an Obsidian-style vault and keeps a resource folder next to every
//! note: created with the note, moved with it, removed with it, and filled
//! with the screenshots pasted into it.

mod app;
mod core;
mod plugin;
mod resources;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::SyncApp;
use crate::core::config::AppConfig;
use crate::core::file_system::FsVault;
use crate::resources::ResourceSync;

#[derive(Parser, Debug)]
#[command(name = "vault-resources", version, about)]
struct Cli {
    /// Vault to watch, defaults to the last watched vault
    vault: Option<PathBuf>,

    /// Host configuration folder inside the vault
    #[arg(long)]
    config_dir: Option<String>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(if cli.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .init();

    tracing::info!("Starting vault-resources...");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {:#}", e);
        AppConfig::default()
    });

    let vault = cli
        .vault
        .or_else(|| config.last_vault.clone())
        .context("No vault given and no vault watched before")?;
    let root = vault
        .canonicalize()
        .with_context(|| format!("Vault not found: {}", vault.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Vault is not a folder: {}", root.display());
    }
    let config_dir = cli
        .config_dir
        .unwrap_or_else(|| config.watch.config_dir.clone());

    config.last_vault = Some(root.clone());
    config.add_recent_vault(root.clone());
    if let Err(e) = config.save() {
        tracing::warn!("Failed to save config: {:#}", e);
    }

    let vault = FsVault::new(&root);
    let documents = vault.markdown_files();
    let mut app = SyncApp::new(vault, &config_dir);
    app.enable_plugin(Box::new(ResourceSync::new()))?;
    app.open_documents(documents);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    // Dropping the watcher stops it
    let _watcher = watch::watch_vault(&root, &config_dir, tx)?;

    app.run(rx).await
}

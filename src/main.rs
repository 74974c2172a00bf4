//! # Zerr - Chat Music Bot
//!
//! Console front-end for the bot plus a few playlist maintenance commands.
//!
//! ## Usage
//!
//! ```bash
//! # Talk to the bot on stdin
//! zerr --catalog catalog.json run
//!
//! # Inspect saved playlists
//! zerr playlists
//! zerr show "road trip"
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use zerr::cli;
use zerr::completion;
use zerr::config::{self, BotConfig};
use zerr::console;
use zerr::playlist::PlaylistStore;

/// Config file merged with the command-line overrides.
fn load_config(args: &cli::Args) -> Result<BotConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => config::get_config_path()?,
    };
    debug!("Loading config from {}", path.display());
    let mut config = BotConfig::load(&path)?;

    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(playlists) = &args.playlists {
        config.playlists_path = Some(playlists.clone());
    }
    if let Some(catalog) = &args.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_store(config: &BotConfig) -> Result<PlaylistStore> {
    let path = config.playlists_path()?;
    PlaylistStore::open(&path)
        .with_context(|| format!("Failed to open playlists at {}", path.display()))
}

/// Main entry point for the Zerr application.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug zerr run` - Enable debug logging
/// - `RUST_LOG=zerr::sequencer=debug zerr run` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match &args.command {
        cli::Command::Run { guild } => {
            let config = load_config(&args)?;
            info!("Starting console bot for guild {guild}");
            console::start(&config, *guild)?;
        }
        cli::Command::Playlists => {
            let store = open_store(&load_config(&args)?)?;
            if store.is_empty() {
                println!("No playlists saved in {}", store.path().display());
            }
            for (name, count) in store.summary() {
                println!("{name}\t{count} tracks");
            }
        }
        cli::Command::Show { name } => {
            let store = open_store(&load_config(&args)?)?;
            let tracks = store.load(name)?;
            for (i, track) in tracks.iter().enumerate() {
                println!("{:>3}. {track}\n     {}", i + 1, track.url);
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(shell),
                &mut cmd,
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

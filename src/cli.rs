//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `zerr` binary.
//!
//! ## Commands
//!
//! - `run`: Start the console bot; each stdin line is a chat message
//! - `playlists`: List saved playlists with their track counts
//! - `show`: Print the tracks of one saved playlist
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! zerr --catalog ~/music/catalog.json run
//! zerr playlists
//! zerr show "road trip"
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Options given here override the values from the config file.
#[derive(Parser, Debug)]
#[command(name = "zerr")]
#[command(about = "Zerr: a chat music bot with a shared play queue")]
#[command(version)]
pub struct Args {
    /// Config file to use instead of the one in the data directory
    #[arg(long, global = true, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Command prefix, e.g. "!" for "!play"
    #[arg(long, global = true, env = "ZERR_PREFIX")]
    pub prefix: Option<String>,

    /// Playlist store file
    #[arg(long, global = true, env = "ZERR_PLAYLISTS", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub playlists: Option<PathBuf>,

    /// Offline catalog with tracks, lyrics and gifs
    #[arg(long, global = true, env = "ZERR_CATALOG", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot on the console
    ///
    /// Every line read from stdin is handled as a chat message, replies and
    /// playback notices go to stdout. Start a line with `@<guild> ` to talk
    /// to another voice session. End of input shuts the bot down.
    Run {
        /// Session addressed by lines without an `@<guild>` prefix
        #[arg(long, default_value_t = 0)]
        guild: u64,
    },

    /// List saved playlists
    Playlists,

    /// Print the tracks of a saved playlist
    Show {
        /// Playlist name
        name: String,
    },

    /// Generate shell completions
    ///
    /// Usage: zerr completion bash > ~/.local/share/bash-completion/completions/zerr
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

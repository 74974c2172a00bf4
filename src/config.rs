//! # Configuration Module
//!
//! Bot settings and data directory locations.
//!
//! ## Data Storage
//!
//! Zerr keeps its files in the platform-standard data directory:
//! - Linux: `~/.local/share/zerr/`
//! - macOS: `~/Library/Application Support/zerr/`
//! - Windows: `%APPDATA%\zerr\`
//!
//! `config.json` there holds a [`BotConfig`]; `playlists.json` is the default
//! playlist store. Every field of the config file is optional.

use crate::sequencer::SequencerConfig;
use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns the platform-appropriate data directory for Zerr, creating it if
/// needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The zerr subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let zerr_dir = data_dir.join("zerr");
    fs::create_dir_all(&zerr_dir).with_context(|| {
        format!(
            "Failed to create Zerr data directory at {}. Please check file permissions.",
            zerr_dir.display()
        )
    })?;

    Ok(zerr_dir)
}

/// Default location of the config file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// Default location of the playlist store.
pub fn get_playlists_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("playlists.json"))
}

/// Settings for the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Text every command starts with
    pub prefix: String,
    /// Playlist store file; the data directory is used when unset
    pub playlists_path: Option<PathBuf>,
    /// Offline catalog used to resolve tracks, lyrics and gifs
    pub catalog_path: Option<PathBuf>,
    /// Pause between the end of a track and the next one
    pub idle_debounce_ms: u64,
    /// Stop sequencing after this many failures in a row (0 = never)
    pub max_consecutive_failures: u32,
    /// Volume for new sessions, 0.0 to 1.0
    pub initial_volume: f32,
    /// Length of a track on the simulated voice sink
    pub simulated_track_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            playlists_path: None,
            catalog_path: None,
            idle_debounce_ms: 500,
            max_consecutive_failures: 5,
            initial_volume: 1.0,
            simulated_track_secs: 5,
        }
    }
}

impl BotConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: BotConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            bail!("Command prefix must not be empty");
        }
        if self.prefix.chars().any(char::is_whitespace) {
            bail!("Command prefix must not contain whitespace");
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            bail!(
                "initial_volume must be between 0.0 and 1.0, got {}",
                self.initial_volume
            );
        }
        Ok(())
    }

    /// The configured playlist file, or the default one in the data directory.
    pub fn playlists_path(&self) -> Result<PathBuf> {
        match &self.playlists_path {
            Some(path) => Ok(path.clone()),
            None => get_playlists_path(),
        }
    }

    pub fn sequencer(&self) -> SequencerConfig {
        SequencerConfig {
            idle_debounce: Duration::from_millis(self.idle_debounce_ms),
            max_consecutive_failures: self.max_consecutive_failures,
            initial_volume: self.initial_volume,
        }
    }

    pub fn track_length(&self) -> Duration {
        Duration::from_secs(self.simulated_track_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir_structure() {
        let dir = get_data_dir().expect("Should get valid data dir");
        assert!(dir.is_absolute());
        assert!(dir.is_dir());
        assert_eq!(dir.file_name().unwrap(), "zerr");
    }

    #[test]
    fn test_default_paths_live_in_data_dir() -> Result<()> {
        let dir = get_data_dir()?;
        assert_eq!(get_config_path()?, dir.join("config.json"));
        assert_eq!(get_playlists_path()?, dir.join("playlists.json"));
        assert_eq!(BotConfig::default().playlists_path()?, dir.join("playlists.json"));
        Ok(())
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = BotConfig::load(&dir.path().join("config.json"))?;
        assert_eq!(config, BotConfig::default());
        assert_eq!(config.sequencer().idle_debounce, Duration::from_millis(500));
        assert_eq!(config.sequencer().max_consecutive_failures, 5);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "prefix": "?", "idle_debounce_ms": 50, "playlists_path": "/tmp/p.json" }"#)?;

        let config = BotConfig::load(&path)?;
        assert_eq!(config.prefix, "?");
        assert_eq!(config.sequencer().idle_debounce, Duration::from_millis(50));
        assert_eq!(config.playlists_path()?, PathBuf::from("/tmp/p.json"));
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.track_length(), Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");

        fs::write(&path, r#"{ "initial_volume": 1.5 }"#)?;
        assert!(BotConfig::load(&path).is_err());

        fs::write(&path, r#"{ "prefix": "" }"#)?;
        assert!(BotConfig::load(&path).is_err());

        fs::write(&path, "not json")?;
        assert!(BotConfig::load(&path).is_err());
        Ok(())
    }
}

//! # Offline Catalog
//!
//! A JSON file standing in for the streaming, lyrics, gif and metadata
//! services, so the console bot works without network access or API keys.
//!
//! ```json
//! {
//!   "tracks": [
//!     { "url": "https://youtu.be/x", "title": "Song", "artist": "Band",
//!       "album": "LP", "year": 1999, "genres": ["rock"], "lyrics": "..." }
//!   ],
//!   "playlists": { "https://open.spotify.com/playlist/abc": ["Song", "Other"] },
//!   "gifs": { "cat": "https://giphy.com/gifs/cat" }
//! }
//! ```
//!
//! Lookups are case-insensitive. A query matches a track by exact url, by
//! metadata id at the end of the url, or by substring of `title artist`.

use crate::error::{Error, Result};
use crate::sources::{GifProvider, LyricsProvider, Query, QuizSource, QuizTrack, TrackSource};
use crate::track::Track;
use anyhow::Context;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub url: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub lyrics: Option<String>,
}

impl CatalogEntry {
    pub fn track(&self) -> Track {
        Track::new(&self.url, &self.title, &self.artist)
    }

    fn matches(&self, needle: &str) -> bool {
        format!("{} {}", self.title, self.artist)
            .to_lowercase()
            .contains(needle)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tracks: Vec<CatalogEntry>,
    /// Playlist url → track queries
    #[serde(default)]
    pub playlists: BTreeMap<String, Vec<String>>,
    /// Keyword → gif url
    #[serde(default)]
    pub gifs: BTreeMap<String, String>,
}

impl Catalog {
    /// Read a catalog file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("Catalog {} is not valid JSON", path.display()))?;
        debug!(
            "Loaded catalog with {} tracks, {} playlists, {} gifs",
            catalog.tracks.len(),
            catalog.playlists.len(),
            catalog.gifs.len()
        );
        Ok(catalog)
    }

    fn find(&self, query: &str) -> Option<&CatalogEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let by_url = |id: &str| {
            self.tracks
                .iter()
                .find(|t| t.url.eq_ignore_ascii_case(id) || t.url.to_lowercase().ends_with(&format!("/{id}")))
        };

        match Query::classify(query) {
            Query::MetadataTrack(id) => by_url(&id.to_lowercase()),
            Query::VideoUrl(url) | Query::AudioHostUrl(url) => by_url(&url.to_lowercase()),
            Query::MetadataPlaylist(_) => None,
            Query::Search(_) => self.tracks.iter().find(|t| t.matches(&needle)),
        }
    }
}

impl TrackSource for Catalog {
    fn resolve(&self, query: &str) -> Result<Track> {
        self.find(query)
            .map(CatalogEntry::track)
            .ok_or_else(|| Error::NotFound(format!("a track matching \"{query}\"")))
    }

    fn resolve_playlist(&self, url: &str) -> Result<Vec<Track>> {
        let wanted = match Query::classify(url) {
            Query::MetadataPlaylist(id) => self
                .playlists
                .iter()
                .find(|(key, _)| key.as_str() == url.trim() || key.ends_with(&format!("/{id}"))),
            _ => self.playlists.iter().find(|(key, _)| key.as_str() == url.trim()),
        };
        let (_, queries) = wanted.ok_or_else(|| Error::NotFound(format!("playlist {url}")))?;

        Ok(queries
            .iter()
            .filter_map(|query| match self.find(query) {
                Some(entry) => Some(entry.track()),
                None => {
                    warn!("Playlist entry \"{query}\" has no matching track; skipping");
                    None
                }
            })
            .collect())
    }
}

impl LyricsProvider for Catalog {
    fn fetch(&self, title: &str, artist: &str) -> Result<String> {
        self.tracks
            .iter()
            .find(|t| t.title.eq_ignore_ascii_case(title) && t.artist.eq_ignore_ascii_case(artist))
            .and_then(|t| t.lyrics.clone())
            .filter(|lyrics| !lyrics.trim().is_empty())
            .ok_or_else(|| Error::NotFound(format!("lyrics for {title} by {artist}")))
    }
}

impl GifProvider for Catalog {
    fn search(&self, query: &str) -> Result<String> {
        let needle = query.trim().to_lowercase();
        self.gifs
            .iter()
            .find(|(keyword, _)| needle.contains(&keyword.to_lowercase()) || keyword.to_lowercase().contains(&needle))
            .map(|(_, url)| url.clone())
            .ok_or_else(|| Error::NotFound(format!("a gif for \"{query}\"")))
    }
}

impl QuizSource for Catalog {
    fn random_tracks(&self) -> Result<Vec<QuizTrack>> {
        Ok(self
            .tracks
            .iter()
            .map(|t| QuizTrack {
                title: t.title.clone(),
                artists: vec![t.artist.clone()],
                album: t.album.clone(),
                release_year: t.year,
                genres: t.genres.clone(),
            })
            .collect())
    }
}

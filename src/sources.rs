//! # Capability Providers
//!
//! Contracts for the outside services the bot leans on: track lookup,
//! lyrics, gif search and quiz material. Real clients live outside this
//! crate; [`catalog`](crate::catalog) provides an offline implementation.
//!
//! [`Query::classify`] decides how a `play` argument is resolved:
//!
//! | Input                              | Kind               |
//! |------------------------------------|--------------------|
//! | `https://open.spotify.com/track/…` | `MetadataTrack`    |
//! | `https://open.spotify.com/playlist/…` | `MetadataPlaylist` |
//! | YouTube watch / short link         | `VideoUrl`         |
//! | `https://soundcloud.com/…`         | `AudioHostUrl`     |
//! | anything else                      | `Search`           |

use crate::error::Result;
use crate::track::Track;

/// Resolves user input into playable tracks.
pub trait TrackSource: Send + Sync {
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) when nothing matches,
    /// [`Error::Upstream`](crate::Error::Upstream) when the service fails.
    fn resolve(&self, query: &str) -> Result<Track>;

    /// Resolve every entry of a remote playlist. Entries that cannot be
    /// matched are skipped.
    fn resolve_playlist(&self, url: &str) -> Result<Vec<Track>>;
}

pub trait LyricsProvider: Send + Sync {
    fn fetch(&self, title: &str, artist: &str) -> Result<String>;
}

pub trait GifProvider: Send + Sync {
    /// URL of the best match.
    fn search(&self, query: &str) -> Result<String>;
}

/// Track facts the quiz asks about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizTrack {
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub release_year: Option<u16>,
    pub genres: Vec<String>,
}

pub trait QuizSource: Send + Sync {
    /// A pool of tracks to draw a quiz question set from.
    fn random_tracks(&self) -> Result<Vec<QuizTrack>>;
}

/// How a `play` argument should be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Music-metadata track link; carries the track id
    MetadataTrack(String),
    /// Music-metadata playlist link; carries the playlist id
    MetadataPlaylist(String),
    VideoUrl(String),
    AudioHostUrl(String),
    Search(String),
}

impl Query {
    pub fn classify(input: &str) -> Self {
        let input = input.trim();

        if input.contains("spotify.com/track") {
            Query::MetadataTrack(trailing_id(input))
        } else if input.contains("spotify.com/playlist") {
            Query::MetadataPlaylist(trailing_id(input))
        } else if is_video_url(input) {
            Query::VideoUrl(input.to_string())
        } else if input.contains("soundcloud.com") {
            Query::AudioHostUrl(input.to_string())
        } else {
            Query::Search(input.to_string())
        }
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, Query::MetadataPlaylist(_))
    }
}

/// Last path segment without its query string.
fn trailing_id(url: &str) -> String {
    let last = url.rsplit('/').next().unwrap_or(url);
    last.split('?').next().unwrap_or(last).to_string()
}

fn is_video_url(input: &str) -> bool {
    let rest = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = rest.strip_prefix("m.").unwrap_or(rest);
    let rest = rest.strip_prefix("music.").unwrap_or(rest);

    if let Some(path) = rest.strip_prefix("youtu.be/") {
        return !path.is_empty();
    }
    match rest.strip_prefix("youtube.com/") {
        Some(path) => {
            (path.starts_with("watch?") && path.contains("v="))
                || path.starts_with("shorts/")
                || path.starts_with("embed/")
                || path.starts_with("live/")
        }
        None => false,
    }
}

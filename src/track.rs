//! # Track Module
//!
//! The playable unit the whole bot passes around. A track is resolved once by a
//! [`TrackSource`](crate::sources::TrackSource) and never changes afterwards;
//! queues, history and saved playlists all hold plain copies of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A playable audio item.
///
/// There is no unique id: two tracks with the same url, title and artist
/// compare equal, but a queue may still hold both as separate entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Location the audio sink streams from
    pub url: String,
    /// Display title
    pub title: String,
    /// Display artist (uploader or first credited artist)
    pub artist: String,
}

impl Track {
    pub fn new(url: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            artist: artist.into(),
        }
    }
}

/// Renders as `title by artist`, the form used in every chat reply.
impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_title_and_artist() {
        let track = Track::new("https://youtu.be/abc", "Song", "Band");
        assert_eq!(track.to_string(), "Song by Band");
    }

    #[test]
    fn test_structural_equality() {
        let a = Track::new("u", "t", "a");
        let b = Track::new("u", "t", "a");
        let c = Track::new("u2", "t", "a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_json_shape_matches_playlist_file() -> anyhow::Result<()> {
        let track = Track::new("https://youtu.be/abc", "Song", "Band");
        let value = serde_json::to_value(&track)?;
        assert_eq!(value["url"], "https://youtu.be/abc");
        assert_eq!(value["title"], "Song");
        assert_eq!(value["artist"], "Band");

        let back: Track = serde_json::from_value(value)?;
        assert_eq!(back, track);
        Ok(())
    }
}

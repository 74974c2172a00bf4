//! Error types shared by the queue engine, playlist store and command layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by bot operations.
///
/// None of these are fatal to the process: the command layer turns each one
/// into a chat reply (see [`Error::kind`]).
#[derive(Debug, Error)]
pub enum Error {
    /// "previous" was requested with an empty history
    #[error("No previous song to play")]
    NoHistory,

    /// Queue position does not exist
    #[error("Queue index {index} is out of range (queue has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Volume outside `0.0..=1.0`
    #[error("Volume {0} is outside 0.0..=1.0")]
    InvalidVolume(f32),

    /// Playlist name was empty
    #[error("Playlist name must not be empty")]
    InvalidName,

    /// No matching track, playlist, lyrics or gif
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation needs a voice session that does not exist
    #[error("Not connected to a voice session")]
    NotConnected,

    /// Durable storage could not be written or read
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Playlist mapping could not be serialised
    #[error("Failed to encode playlists: {0}")]
    Encode(#[from] serde_json::Error),

    /// A collaborator (track source, audio sink, lyrics, gifs) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The sequencer thread is gone
    #[error("Playback sequencer has stopped")]
    SequencerStopped,
}

/// Coarse classification used when reporting errors to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Persistence,
    Upstream,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::NotConnected | Error::NoHistory => ErrorKind::NotFound,
            Error::IndexOutOfRange { .. } | Error::InvalidVolume(_) | Error::InvalidName => {
                ErrorKind::InvalidInput
            }
            Error::Persistence { .. } | Error::Encode(_) => ErrorKind::Persistence,
            Error::Upstream(_) | Error::SequencerStopped => ErrorKind::Upstream,
        }
    }

    /// Shorthand for wrapping a collaborator failure.
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Error::Upstream(err.to_string())
    }
}

/// Result type for bot operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::NoHistory.kind(), ErrorKind::NotFound);
        assert_eq!(Error::IndexOutOfRange { index: 5, len: 2 }.kind(), ErrorKind::InvalidInput);
        assert_eq!(Error::InvalidVolume(1.5).kind(), ErrorKind::InvalidInput);
        assert_eq!(Error::InvalidName.kind(), ErrorKind::InvalidInput);
        assert_eq!(Error::upstream("boom").kind(), ErrorKind::Upstream);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = Error::Persistence { path: PathBuf::from("/tmp/p.json"), source: io };
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_messages_are_readable() {
        let err = Error::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(err.to_string(), "Queue index 5 is out of range (queue has 2 entries)");
    }
}

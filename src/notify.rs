//! Notices the sequencer posts to a session's text channel on its own, outside
//! any command reply.

use crate::session::SessionId;
use crate::track::Track;
use log::{info, warn};
use std::fmt;
use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A track started streaming
    NowPlaying(Track),
    /// Advance found nothing left to play
    QueueEmpty,
    /// A track could not be started or broke mid-stream
    PlaybackFailed { track: Track, reason: String },
    /// Too many consecutive failures; sequencing stopped
    Halted { failures: u32 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NowPlaying(track) => write!(f, "Now playing: {track}\n{}", track.url),
            Notice::QueueEmpty => write!(f, "The queue is empty."),
            Notice::PlaybackFailed { track, reason } => {
                write!(f, "Could not play {track}: {reason}")
            }
            Notice::Halted { failures } => write!(
                f,
                "Stopped playback after {failures} failed tracks in a row. Add a song to try again."
            ),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, session: SessionId, notice: Notice);
}

/// Writes notices to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, session: SessionId, notice: Notice) {
        match &notice {
            Notice::PlaybackFailed { .. } | Notice::Halted { .. } => warn!("[{session}] {notice}"),
            _ => info!("[{session}] {notice}"),
        }
    }
}

/// Prints notices to a writer (stdout for the console bot).
pub struct WriterNotifier<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }
}

impl<W: Write + Send> Notifier for WriterNotifier<W> {
    fn notify(&self, session: SessionId, notice: Notice) {
        let Ok(mut out) = self.out.lock() else {
            warn!("Notifier output lock poisoned; dropping notice for session {session}");
            return;
        };
        if let Err(e) = writeln!(out, "[{session}] {notice}") {
            warn!("Failed to write notice: {e}");
        }
    }
}

/// Keeps every notice in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<(SessionId, Notice)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<(SessionId, Notice)> {
        self.notices
            .lock()
            .map(|mut notices| std::mem::take(&mut *notices))
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, session: SessionId, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push((session, notice));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_playing_text() {
        let notice = Notice::NowPlaying(Track::new("https://youtu.be/x", "Song", "Band"));
        assert_eq!(notice.to_string(), "Now playing: Song by Band\nhttps://youtu.be/x");
    }

    #[test]
    fn test_writer_notifier_prefixes_session() {
        let notifier = WriterNotifier::new(Vec::new());
        notifier.notify(SessionId(7), Notice::QueueEmpty);

        let out = notifier.out.into_inner().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[7] The queue is empty.\n");
    }

    #[test]
    fn test_memory_notifier_drains() {
        let notifier = MemoryNotifier::new();
        notifier.notify(SessionId(1), Notice::QueueEmpty);
        notifier.notify(SessionId(2), Notice::Halted { failures: 3 });

        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.take().is_empty());
    }
}

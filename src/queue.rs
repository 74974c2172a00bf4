//! # Queue Engine
//!
//! The playback state machine for one voice session: the pending queue, the
//! play history, the current song, loop mode and volume.
//!
//! The engine performs no I/O. It only answers "what plays next" and keeps
//! its bookkeeping consistent; the [`sequencer`](crate::sequencer) turns those
//! answers into audio sink calls, notifications and debounced re-advances.
//!
//! ## Transitions
//!
//! ```text
//! enqueue ──(not playing)──> advance ──> Started(track) ──> sink plays
//!                               ^                             │
//!                               │                          idle signal
//!                          (debounce)                         │
//!                               └────── finish_current <──────┘
//! ```
//!
//! - **advance**: retires the current song into history (unless looping) and
//!   promotes the queue head. An empty queue clears the current song.
//! - **finish_current**: with loop mode on, re-appends the song that just
//!   ended so the queue cycles without losing or duplicating tracks.
//! - **skip_previous**: puts the current song back at the *front* of the
//!   queue and restores the last history entry; the next advance replays it
//!   instead of dequeuing.

use crate::error::{Error, Result};
use crate::track::Track;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

/// Outcome of [`QueueEngine::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// This track is now current and should be streamed
    Started(Track),
    /// Nothing left to play; the session is idle
    Exhausted,
}

/// Queue, history and playback flags of a single session.
///
/// Invariant: the session is playing exactly when a current song is set.
#[derive(Debug, Clone)]
pub struct QueueEngine {
    queue: VecDeque<Track>,
    /// Most recent last
    history: Vec<Track>,
    current: Option<Track>,
    looping: bool,
    volume: f32,
    /// Set by `skip_previous`: the next advance replays `current`
    replay_current: bool,
}

impl Default for QueueEngine {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            history: Vec::new(),
            current: None,
            looping: false,
            volume: 1.0,
            replay_current: false,
        }
    }
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a starting volume.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVolume`] if `volume` is outside `0.0..=1.0`.
    pub fn with_volume(volume: f32) -> Result<Self> {
        let mut engine = Self::default();
        engine.set_volume(volume)?;
        Ok(engine)
    }

    /// Append a track to the back of the queue.
    ///
    /// Returns `true` when nothing is playing, meaning the caller must
    /// [`advance`](Self::advance) to start playback. A track arriving while
    /// another plays only extends the queue.
    pub fn enqueue(&mut self, track: Track) -> bool {
        self.queue.push_back(track);
        !self.is_playing()
    }

    /// Append several tracks, keeping their order. Same return contract as
    /// [`enqueue`](Self::enqueue); an empty batch never requests an advance.
    pub fn enqueue_many<I>(&mut self, tracks: I) -> bool
    where
        I: IntoIterator<Item = Track>,
    {
        let before = self.queue.len();
        self.queue.extend(tracks);
        self.queue.len() > before && !self.is_playing()
    }

    /// The central sequencing step.
    pub fn advance(&mut self) -> Advance {
        if self.replay_current {
            self.replay_current = false;
            if let Some(track) = &self.current {
                return Advance::Started(track.clone());
            }
        }

        let Some(next) = self.queue.pop_front() else {
            self.current = None;
            return Advance::Exhausted;
        };

        if let Some(previous) = self.current.take() {
            if !self.looping {
                self.history.push(previous);
            }
        }

        self.current = Some(next.clone());
        Advance::Started(next)
    }

    /// Bookkeeping for the end of the current resource.
    ///
    /// In loop mode the finished song goes to the back of the queue. A song
    /// restored by [`skip_previous`](Self::skip_previous) is left alone so the
    /// following advance can replay it.
    pub fn finish_current(&mut self) {
        if self.replay_current || !self.looping {
            return;
        }
        if let Some(track) = &self.current {
            self.queue.push_back(track.clone());
        }
    }

    /// Step back to the most recent history entry.
    ///
    /// The current song (if any) is pushed to the front of the queue so it
    /// plays again right after the restored one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHistory`] if nothing has been played before.
    pub fn skip_previous(&mut self) -> Result<Track> {
        let previous = self.history.pop().ok_or(Error::NoHistory)?;

        if let Some(current) = self.current.take() {
            self.queue.push_front(current);
        }

        self.current = Some(previous.clone());
        self.replay_current = true;
        Ok(previous)
    }

    /// Remove and return the queue entry at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] and leaves the queue untouched if
    /// `index` is past the end.
    pub fn delete_at(&mut self, index: usize) -> Result<Track> {
        let len = self.queue.len();
        self.queue
            .remove(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Uniform in-place permutation of the queue. History and the current
    /// song are not touched.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.queue.make_contiguous().shuffle(rng);
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidVolume`] if `volume` is outside `0.0..=1.0`
    /// (NaN included). The stored volume is unchanged in that case.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::InvalidVolume(volume));
        }
        self.volume = volume;
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Copy of the pending queue, front first.
    pub fn snapshot_queue(&self) -> Vec<Track> {
        self.queue.iter().cloned().collect()
    }

    /// Copy of the history, oldest first.
    pub fn snapshot_history(&self) -> Vec<Track> {
        self.history.clone()
    }

    /// Replace the whole queue with a copy of `tracks`.
    ///
    /// History and the current song stay as they are. Returns `true` when
    /// the caller must advance because nothing is playing.
    pub fn load_snapshot(&mut self, tracks: &[Track]) -> bool {
        self.queue = tracks.iter().cloned().collect();
        !self.is_playing() && !self.queue.is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the next advance will replay the restored current song.
    pub fn replay_pending(&self) -> bool {
        self.replay_current
    }

    /// Stop sequencing without touching the queue: the current song is
    /// dropped and any pending replay is cancelled.
    pub fn halt(&mut self) {
        self.current = None;
        self.replay_current = false;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn track(name: &str) -> Track {
        Track::new(format!("https://youtu.be/{name}"), name, format!("{name} artist"))
    }

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_first_enqueued_track_becomes_current() {
        let mut engine = QueueEngine::new();
        assert!(engine.enqueue(track("A")));
        // Still not playing until someone advances
        assert!(engine.enqueue(track("B")));
        assert!(engine.enqueue(track("C")));

        assert_eq!(engine.advance(), Advance::Started(track("A")));
        assert_eq!(engine.current(), Some(&track("A")));
        assert!(engine.is_playing());
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B", "C"]);
    }

    #[test]
    fn test_enqueue_while_playing_does_not_request_advance() {
        let mut engine = QueueEngine::new();
        engine.enqueue(track("A"));
        engine.advance();

        assert!(!engine.enqueue(track("B")));
        assert_eq!(engine.current(), Some(&track("A")));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_two_track_scenario_without_loop() {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B")]);

        assert_eq!(engine.advance(), Advance::Started(track("A")));
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B"]);

        // idle
        engine.finish_current();
        assert_eq!(engine.advance(), Advance::Started(track("B")));
        assert_eq!(titles(&engine.snapshot_history()), vec!["A"]);
        assert!(engine.is_empty());

        // idle again
        engine.finish_current();
        assert_eq!(engine.advance(), Advance::Exhausted);
        assert!(!engine.is_playing());
        assert_eq!(engine.current(), None);
    }

    #[test]
    fn test_loop_cycles_back_to_original_order() {
        let mut engine = QueueEngine::new();
        engine.set_loop(true);
        engine.enqueue_many([track("A"), track("B"), track("C")]);
        engine.advance();
        let original = engine.snapshot_queue();

        for _ in 0..3 {
            engine.finish_current();
            assert!(matches!(engine.advance(), Advance::Started(_)));
        }

        assert_eq!(engine.current(), Some(&track("A")));
        assert_eq!(engine.snapshot_queue(), original);
        assert!(engine.snapshot_history().is_empty(), "looping never fills history");
    }

    #[test]
    fn test_loop_single_track_replays_forever() {
        let mut engine = QueueEngine::new();
        engine.set_loop(true);
        engine.enqueue(track("A"));
        engine.advance();

        for _ in 0..5 {
            engine.finish_current();
            assert_eq!(engine.advance(), Advance::Started(track("A")));
            assert!(engine.is_empty());
        }
    }

    #[test]
    fn test_skip_previous_restores_history() -> Result<()> {
        let mut engine = QueueEngine::new();
        engine.enqueue(track("A"));
        engine.advance();
        engine.enqueue(track("B"));
        engine.advance();

        let restored = engine.skip_previous()?;
        assert_eq!(restored, track("A"));
        assert_eq!(engine.current(), Some(&track("A")));
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B"]);
        assert!(engine.snapshot_history().is_empty());
        assert!(engine.replay_pending());

        // The stop that follows routes through finish/advance and replays A
        engine.finish_current();
        assert_eq!(engine.advance(), Advance::Started(track("A")));
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B"]);

        // Afterwards normal sequencing resumes with B
        engine.finish_current();
        assert_eq!(engine.advance(), Advance::Started(track("B")));
        assert_eq!(titles(&engine.snapshot_history()), vec!["A"]);
        Ok(())
    }

    #[test]
    fn test_skip_previous_keeps_current_at_front_of_nonempty_queue() -> Result<()> {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B"), track("C"), track("D")]);
        engine.advance();
        engine.finish_current();
        engine.advance();

        engine.skip_previous()?;
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B", "C", "D"]);
        Ok(())
    }

    #[test]
    fn test_skip_previous_without_history_fails() {
        let mut engine = QueueEngine::new();
        engine.enqueue(track("A"));
        engine.advance();

        assert!(matches!(engine.skip_previous(), Err(Error::NoHistory)));
        assert_eq!(engine.current(), Some(&track("A")));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_loop_does_not_duplicate_restored_track() -> Result<()> {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B")]);
        engine.advance();
        engine.finish_current();
        engine.advance();
        engine.set_loop(true);

        engine.skip_previous()?;
        engine.finish_current();
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B"]);
        Ok(())
    }

    #[test]
    fn test_delete_at_out_of_range_leaves_queue_unchanged() {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B")]);

        let err = engine.delete_at(5).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 2 }));
        assert_eq!(titles(&engine.snapshot_queue()), vec!["A", "B"]);
    }

    #[test]
    fn test_delete_at_removes_entry() -> Result<()> {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B"), track("C")]);

        assert_eq!(engine.delete_at(1)?, track("B"));
        assert_eq!(titles(&engine.snapshot_queue()), vec!["A", "C"]);
        Ok(())
    }

    #[test]
    fn test_shuffle_preserves_multiset() {
        let mut engine = QueueEngine::new();
        let tracks: Vec<Track> = (0..20).map(|i| track(&i.to_string())).collect();
        // duplicates must survive too
        engine.enqueue_many(tracks.iter().cloned().chain([track("0")]));
        engine.advance();
        let before_history = engine.snapshot_history();
        let before_current = engine.current().cloned();

        let mut rng = StdRng::seed_from_u64(7);
        engine.shuffle(&mut rng);

        let mut after = engine.snapshot_queue();
        let mut expected: Vec<Track> = tracks[1..].iter().cloned().chain([track("0")]).collect();
        assert_eq!(after.len(), expected.len());
        after.sort_by(|a, b| a.title.cmp(&b.title));
        expected.sort_by(|a, b| a.title.cmp(&b.title));
        assert_eq!(after, expected);
        assert_eq!(engine.snapshot_history(), before_history);
        assert_eq!(engine.current().cloned(), before_current);
    }

    #[test]
    fn test_volume_validation() -> Result<()> {
        let mut engine = QueueEngine::new();
        assert!(matches!(engine.set_volume(1.5), Err(Error::InvalidVolume(_))));
        assert!(engine.set_volume(-0.1).is_err());
        assert!(engine.set_volume(f32::NAN).is_err());
        assert_eq!(engine.volume(), 1.0);

        engine.set_volume(0.5)?;
        assert_eq!(engine.volume(), 0.5);
        engine.set_volume(0.0)?;
        assert_eq!(engine.volume(), 0.0);
        Ok(())
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B")]);

        let mut snapshot = engine.snapshot_queue();
        snapshot.clear();
        snapshot.push(track("Z"));

        assert_eq!(titles(&engine.snapshot_queue()), vec!["A", "B"]);
    }

    #[test]
    fn test_load_snapshot_replaces_queue_only() {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B")]);
        engine.advance();
        engine.finish_current();
        engine.advance();

        let playlist = vec![track("X"), track("Y")];
        assert!(!engine.load_snapshot(&playlist), "already playing");
        assert_eq!(titles(&engine.snapshot_queue()), vec!["X", "Y"]);
        assert_eq!(engine.current(), Some(&track("B")));
        assert_eq!(titles(&engine.snapshot_history()), vec!["A"]);
    }

    #[test]
    fn test_load_snapshot_requests_advance_when_idle() {
        let mut engine = QueueEngine::new();
        assert!(engine.load_snapshot(&[track("X")]));
        assert!(!engine.load_snapshot(&[]));
    }

    #[test]
    fn test_enqueue_many_empty_batch() {
        let mut engine = QueueEngine::new();
        assert!(!engine.enqueue_many(Vec::new()));
        assert!(engine.enqueue_many(vec![track("A")]));
    }

    #[test]
    fn test_halt_keeps_queue() {
        let mut engine = QueueEngine::new();
        engine.enqueue_many([track("A"), track("B")]);
        engine.advance();

        engine.halt();
        assert!(!engine.is_playing());
        assert_eq!(titles(&engine.snapshot_queue()), vec!["B"]);
        assert_eq!(engine.advance(), Advance::Started(track("B")));
    }

    #[test]
    fn test_with_volume_rejects_out_of_range() {
        assert!(QueueEngine::with_volume(2.0).is_err());
        assert!(QueueEngine::with_volume(0.25).is_ok());
    }
}

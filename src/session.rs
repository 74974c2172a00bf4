//! # Session Registry
//!
//! One [`QueueEngine`] per voice session, keyed by the chat server (guild)
//! id. Sessions are created lazily on first use and dropped on `leave`.

use crate::queue::QueueEngine;
use crate::sink::AudioSink;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a voice session (the guild it belongs to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session playback bookkeeping owned by the sequencer.
pub struct Session {
    pub engine: QueueEngine,
    /// Voice connection, opened on the first track
    pub sink: Option<Box<dyn AudioSink>>,
    /// Bumped on every play; idle signals carry it back
    pub generation: u64,
    /// A resource is streaming and will report idle
    pub in_flight: bool,
    /// Generation whose debounced advance is still pending
    pub awaiting_advance: Option<u64>,
    /// Consecutive start/stream failures
    pub failures: u32,
}

impl Session {
    pub fn new(engine: QueueEngine) -> Self {
        Self {
            engine,
            sink: None,
            generation: 0,
            in_flight: false,
            awaiting_advance: None,
            failures: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("connected", &self.sink.is_some())
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight)
            .field("awaiting_advance", &self.awaiting_advance)
            .field("failures", &self.failures)
            .finish()
    }
}

/// All live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Fetch a session, creating it with `init` if it does not exist yet.
    pub fn get_or_insert_with(&mut self, id: SessionId, init: impl FnOnce() -> QueueEngine) -> &mut Session {
        self.sessions
            .entry(id)
            .or_insert_with(|| Session::new(init()))
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Session ids in ascending order.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

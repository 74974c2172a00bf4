//! # Playback Sequencer
//!
//! Owns every [`Session`](crate::session::Session) and is the only place their
//! state changes. It runs on one dedicated thread; chat handlers reach it
//! through a [`SequencerHandle`], which ships closures over a channel and
//! waits for the answer, so there is never parallel mutation of a queue.
//!
//! ## Idle chaining
//!
//! 1. A track starts: the session's generation is bumped and the sink gets an
//!    [`IdleSignal`] carrying it.
//! 2. The sink fires the signal: [`Event::Idle`] lands in the loop. Stale
//!    generations are dropped, so at most one resource per session drives
//!    the queue.
//! 3. An [`Event::Advance`] is scheduled after the debounce delay (500ms by
//!    default). Until then the session still counts as playing, so new
//!    tracks only extend the queue.
//! 4. The advance does the loop bookkeeping (the finished song goes to the
//!    back) and promotes the next track, or reports the queue empty.
//!
//! A failing source takes the same path. Consecutive failures are counted and
//! sequencing halts once the configured limit is reached.

use crate::error::{Error, Result};
use crate::notify::{Notice, Notifier};
use crate::queue::{Advance, QueueEngine};
use crate::session::{Session, SessionId, SessionRegistry};
use crate::sink::{IdleReason, IdleSignal, SinkFactory};
use crate::track::Track;
use log::{debug, info, warn};
use rand::Rng;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something that happened outside a command: the sequencer reacts to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The session's audio resource went idle
    Idle {
        session: SessionId,
        generation: u64,
        reason: IdleReason,
    },
    /// Debounce elapsed; promote the next track
    Advance { session: SessionId, generation: u64 },
}

/// Delivers events back into the sequencer loop.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, event: Event);

    fn dispatch_after(&self, delay: Duration, event: Event);
}

/// Timing and limits for sequencing.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Pause between an idle signal and the next advance
    pub idle_debounce: Duration,
    /// Halt a session after this many failures in a row (0 = never)
    pub max_consecutive_failures: u32,
    /// Volume new sessions start with
    pub initial_volume: f32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            idle_debounce: Duration::from_millis(500),
            max_consecutive_failures: 5,
            initial_volume: 1.0,
        }
    }
}

pub struct Sequencer {
    sessions: SessionRegistry,
    sinks: Box<dyn SinkFactory>,
    notifier: Arc<dyn Notifier>,
    dispatcher: Arc<dyn Dispatcher>,
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(
        config: SequencerConfig,
        sinks: Box<dyn SinkFactory>,
        notifier: Arc<dyn Notifier>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            sinks,
            notifier,
            dispatcher,
            config,
        }
    }

    fn session_mut(&mut self, id: SessionId) -> &mut Session {
        let volume = self.config.initial_volume;
        self.sessions.get_or_insert_with(id, || {
            QueueEngine::with_volume(volume).unwrap_or_else(|e| {
                warn!("Ignoring configured initial volume: {e}");
                QueueEngine::new()
            })
        })
    }

    /// Append a track; starts playback if the session is idle.
    pub fn enqueue(&mut self, id: SessionId, track: Track) {
        debug!("[{id}] Queued {track}");
        if self.session_mut(id).engine.enqueue(track) {
            self.start_next(id);
        }
    }

    /// Append a batch in order; returns how many were added.
    pub fn enqueue_many(&mut self, id: SessionId, tracks: Vec<Track>) -> usize {
        let count = tracks.len();
        debug!("[{id}] Queued {count} tracks");
        if self.session_mut(id).engine.enqueue_many(tracks) {
            self.start_next(id);
        }
        count
    }

    /// Stop the current resource; its idle signal advances the queue.
    pub fn skip_next(&mut self, id: SessionId) -> Result<()> {
        let session = self.sessions.get_mut(id).ok_or(Error::NotConnected)?;
        if let Some(sink) = session.sink.as_mut() {
            sink.stop();
        }
        Ok(())
    }

    /// Restore the previous track and play it; the interrupted track goes
    /// to the front of the queue.
    pub fn skip_previous(&mut self, id: SessionId) -> Result<Track> {
        let session = self.sessions.get_mut(id).ok_or(Error::NoHistory)?;
        let restored = session.engine.skip_previous()?;
        info!("[{id}] Going back to {restored}");

        if session.in_flight {
            if let Some(sink) = session.sink.as_mut() {
                sink.stop();
            }
        } else if session.awaiting_advance.is_none() {
            self.start_next(id);
        }
        Ok(restored)
    }

    pub fn pause(&mut self, id: SessionId) -> Result<()> {
        let sink = self
            .sessions
            .get_mut(id)
            .and_then(|s| s.sink.as_mut())
            .ok_or(Error::NotConnected)?;
        sink.pause();
        Ok(())
    }

    pub fn resume(&mut self, id: SessionId) -> Result<()> {
        let sink = self
            .sessions
            .get_mut(id)
            .and_then(|s| s.sink.as_mut())
            .ok_or(Error::NotConnected)?;
        sink.resume();
        Ok(())
    }

    pub fn set_loop(&mut self, id: SessionId, looping: bool) {
        self.session_mut(id).engine.set_loop(looping);
    }

    /// Store the volume and apply it to the in-flight resource, if any.
    pub fn set_volume(&mut self, id: SessionId, volume: f32) -> Result<()> {
        let session = self.session_mut(id);
        session.engine.set_volume(volume)?;
        if session.in_flight {
            if let Some(sink) = session.sink.as_mut() {
                sink.set_volume(volume);
            }
        }
        Ok(())
    }

    pub fn delete_at(&mut self, id: SessionId, index: usize) -> Result<Track> {
        match self.sessions.get_mut(id) {
            Some(session) => session.engine.delete_at(index),
            None => Err(Error::IndexOutOfRange { index, len: 0 }),
        }
    }

    pub fn shuffle(&mut self, id: SessionId) {
        self.shuffle_with(id, &mut rand::thread_rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, id: SessionId, rng: &mut R) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.engine.shuffle(rng);
        }
    }

    pub fn snapshot_queue(&self, id: SessionId) -> Vec<Track> {
        self.sessions
            .get(id)
            .map(|s| s.engine.snapshot_queue())
            .unwrap_or_default()
    }

    pub fn history(&self, id: SessionId) -> Vec<Track> {
        self.sessions
            .get(id)
            .map(|s| s.engine.snapshot_history())
            .unwrap_or_default()
    }

    /// Replace the queue with a copy of `tracks`; starts playback if idle.
    pub fn load_snapshot(&mut self, id: SessionId, tracks: &[Track]) {
        if self.session_mut(id).engine.load_snapshot(tracks) {
            self.start_next(id);
        }
    }

    pub fn now_playing(&self, id: SessionId) -> Option<Track> {
        self.sessions.get(id).and_then(|s| s.engine.current().cloned())
    }

    pub fn volume(&self, id: SessionId) -> f32 {
        self.sessions
            .get(id)
            .map_or(self.config.initial_volume, |s| s.engine.volume())
    }

    pub fn is_looping(&self, id: SessionId) -> bool {
        self.sessions.get(id).is_some_and(|s| s.engine.is_looping())
    }

    pub fn is_connected(&self, id: SessionId) -> bool {
        self.sessions.get(id).is_some_and(Session::is_connected)
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        self.sessions.ids()
    }

    /// Disconnect from voice and forget the session's queue and history.
    pub fn leave(&mut self, id: SessionId) -> Result<()> {
        if !self.is_connected(id) {
            return Err(Error::NotConnected);
        }
        if let Some(mut session) = self.sessions.remove(id) {
            if let Some(mut sink) = session.sink.take() {
                sink.disconnect();
            }
        }
        info!("[{id}] Left voice session");
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Idle {
                session,
                generation,
                reason,
            } => self.on_idle(session, generation, reason),
            Event::Advance {
                session,
                generation,
            } => self.on_advance(session, generation),
        }
    }

    fn on_idle(&mut self, id: SessionId, generation: u64, reason: IdleReason) {
        let Some(session) = self.sessions.get_mut(id) else {
            debug!("[{id}] Idle signal for a session that no longer exists");
            return;
        };
        if generation != session.generation || !session.in_flight {
            debug!(
                "[{id}] Ignoring stale idle signal (generation {generation}, current {})",
                session.generation
            );
            return;
        }
        session.in_flight = false;

        if reason == IdleReason::Failed {
            if let Some(track) = session.engine.current().cloned() {
                warn!("[{id}] Stream for {track} ended with an error");
                self.notifier.notify(
                    id,
                    Notice::PlaybackFailed {
                        track,
                        reason: "the stream ended with an error".to_string(),
                    },
                );
            }
            self.record_failure(id, generation);
        } else {
            session.failures = 0;
            self.schedule_advance(id, generation);
        }
    }

    fn on_advance(&mut self, id: SessionId, generation: u64) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        if session.awaiting_advance != Some(generation) {
            debug!("[{id}] Dropping outdated advance for generation {generation}");
            return;
        }
        session.awaiting_advance = None;
        session.engine.finish_current();
        self.start_next(id);
    }

    fn schedule_advance(&mut self, id: SessionId, generation: u64) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.awaiting_advance = Some(generation);
        self.dispatcher.dispatch_after(
            self.config.idle_debounce,
            Event::Advance {
                session: id,
                generation,
            },
        );
    }

    fn record_failure(&mut self, id: SessionId, generation: u64) {
        let limit = self.config.max_consecutive_failures;
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.failures += 1;

        if limit > 0 && session.failures >= limit {
            let failures = session.failures;
            warn!("[{id}] Halting after {failures} consecutive failures");
            session.engine.finish_current();
            session.engine.halt();
            session.failures = 0;
            session.awaiting_advance = None;
            self.notifier.notify(id, Notice::Halted { failures });
            return;
        }
        self.schedule_advance(id, generation);
    }

    fn start_next(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        match session.engine.advance() {
            Advance::Started(track) => self.start_playback(id, track),
            Advance::Exhausted => {
                session.in_flight = false;
                session.failures = 0;
                info!("[{id}] Queue exhausted");
                self.notifier.notify(id, Notice::QueueEmpty);
            }
        }
    }

    fn start_playback(&mut self, id: SessionId, track: Track) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.generation += 1;
        let generation = session.generation;
        let signal = IdleSignal::new(id, generation, Arc::clone(&self.dispatcher));

        match play_on(session, self.sinks.as_mut(), id, &track, signal) {
            Ok(()) => {
                session.in_flight = true;
                info!("[{id}] Now playing {track}");
                self.notifier.notify(id, Notice::NowPlaying(track));
            }
            Err(e) => {
                warn!("[{id}] Could not start {track}: {e}");
                self.notifier.notify(
                    id,
                    Notice::PlaybackFailed {
                        track,
                        reason: e.to_string(),
                    },
                );
                self.record_failure(id, generation);
            }
        }
    }

    /// Stop every resource and drop all sessions.
    pub fn shutdown(&mut self) {
        for id in self.sessions.ids() {
            if let Some(mut session) = self.sessions.remove(id) {
                if let Some(mut sink) = session.sink.take() {
                    sink.disconnect();
                }
            }
        }
    }

    fn run(mut self, rx: mpsc::Receiver<Message>) {
        info!("Sequencer started");
        for message in rx {
            match message {
                Message::Call(call) => call(&mut self),
                Message::Event(event) => self.handle_event(event),
                Message::Shutdown => break,
            }
        }
        self.shutdown();
        info!("Sequencer stopped");
    }
}

/// Start `track` on the session's sink, joining voice first if needed.
fn play_on(
    session: &mut Session,
    sinks: &mut dyn SinkFactory,
    id: SessionId,
    track: &Track,
    signal: IdleSignal,
) -> Result<()> {
    let volume = session.engine.volume();
    if let Some(sink) = session.sink.as_mut() {
        return sink.play(track, volume, signal);
    }

    let mut sink = sinks.connect(id)?;
    let started = sink.play(track, volume, signal);
    session.sink = Some(sink);
    started
}

enum Message {
    Call(Box<dyn FnOnce(&mut Sequencer) + Send>),
    Event(Event),
    Shutdown,
}

/// Feeds events into the sequencer thread's channel.
struct ChannelDispatcher {
    tx: mpsc::Sender<Message>,
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, event: Event) {
        if self.tx.send(Message::Event(event)).is_err() {
            debug!("Sequencer gone; dropping event");
        }
    }

    fn dispatch_after(&self, delay: Duration, event: Event) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            if tx.send(Message::Event(event)).is_err() {
                debug!("Sequencer gone; dropping delayed event");
            }
        });
    }
}

/// Records events instead of delivering them, so a caller can step the
/// sequencer by hand with [`Sequencer::handle_event`].
#[derive(Debug, Default)]
pub struct QueuedDispatcher {
    events: Mutex<Vec<(Duration, Event)>>,
}

impl QueuedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far with its requested delay, oldest first.
    pub fn drain(&self) -> Vec<(Duration, Event)> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl Dispatcher for QueuedDispatcher {
    fn dispatch(&self, event: Event) {
        self.dispatch_after(Duration::ZERO, event);
    }

    fn dispatch_after(&self, delay: Duration, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push((delay, event));
        }
    }
}

/// Cloneable access to a running sequencer thread.
#[derive(Clone)]
pub struct SequencerHandle {
    tx: mpsc::Sender<Message>,
}

impl SequencerHandle {
    /// Run `f` on the sequencer thread and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequencerStopped`] if the thread has exited.
    pub fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Sequencer) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Message::Call(Box::new(move |sequencer| {
                let _ = reply_tx.send(f(sequencer));
            })))
            .map_err(|_| Error::SequencerStopped)?;
        reply_rx.recv().map_err(|_| Error::SequencerStopped)
    }

    /// Ask the loop to stop after the messages already queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// Start the sequencer on its own thread.
///
/// # Errors
///
/// Returns [`Error::Upstream`] if the thread cannot be spawned.
pub fn spawn(
    config: SequencerConfig,
    sinks: Box<dyn SinkFactory>,
    notifier: Arc<dyn Notifier>,
) -> Result<(SequencerHandle, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel();
    let dispatcher = Arc::new(ChannelDispatcher { tx: tx.clone() });
    let sequencer = Sequencer::new(config, sinks, notifier, dispatcher);

    let join = thread::Builder::new()
        .name("sequencer".to_string())
        .spawn(move || sequencer.run(rx))
        .map_err(Error::upstream)?;

    Ok((SequencerHandle { tx }, join))
}

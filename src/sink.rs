//! # Audio Sink Module
//!
//! Contracts for the audio output side of a voice session, plus a simulated
//! sink used by the console front-end.
//!
//! A sink streams one track at a time. When the resource ends (finished,
//! stopped or failed) it fires the [`IdleSignal`] it was handed in
//! [`AudioSink::play`]. The signal is consumed on use, so each play reports
//! idle at most once; it carries the session's play generation so the
//! sequencer can discard signals from resources it already replaced.

use crate::error::{Error, Result};
use crate::sequencer::{Dispatcher, Event};
use crate::session::SessionId;
use crate::track::Track;
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Why a resource went idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// Played to the end
    Finished,
    /// Stopped on request (skip, previous, leave)
    Stopped,
    /// Stream broke or could not be decoded
    Failed,
}

/// One-shot completion callback for a single `play` call.
pub struct IdleSignal {
    session: SessionId,
    generation: u64,
    dispatcher: Arc<dyn Dispatcher>,
}

impl IdleSignal {
    pub fn new(session: SessionId, generation: u64, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            session,
            generation,
            dispatcher,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report that the resource went idle.
    pub fn fire(self, reason: IdleReason) {
        debug!(
            "Idle signal for session {} (generation {}): {reason:?}",
            self.session, self.generation
        );
        self.dispatcher.dispatch(Event::Idle {
            session: self.session,
            generation: self.generation,
            reason,
        });
    }
}

impl std::fmt::Debug for IdleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleSignal")
            .field("session", &self.session)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Audio output for one voice session.
pub trait AudioSink: Send {
    /// Start streaming `track` at `volume`, replacing whatever was playing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the resource cannot be started. The
    /// signal is dropped in that case and never fires.
    fn play(&mut self, track: &Track, volume: f32, on_idle: IdleSignal) -> Result<()>;

    /// Stop the current resource; its idle signal fires with `Stopped`.
    fn stop(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Apply a volume to the in-flight resource.
    fn set_volume(&mut self, volume: f32);

    /// Leave the voice channel. Stops any resource first.
    fn disconnect(&mut self) {
        self.stop();
    }
}

/// Joins voice channels, producing one sink per session.
pub trait SinkFactory: Send {
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the voice connection fails.
    fn connect(&mut self, session: SessionId) -> Result<Box<dyn AudioSink>>;
}

enum Control {
    Stop,
    Pause,
    Resume,
}

/// A sink that "plays" each track for a fixed duration on a timer thread.
///
/// Stands in for a real voice connection in the console bot: it honours
/// stop, pause and resume and fires idle signals exactly like a real sink.
pub struct SimulatedSink {
    track_length: Duration,
    control: Option<mpsc::Sender<Control>>,
    volume: f32,
}

impl SimulatedSink {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            control: None,
            volume: 1.0,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn send(&mut self, message: Control) {
        if let Some(control) = &self.control {
            // The timer thread exits once its track is done
            if control.send(message).is_err() {
                self.control = None;
            }
        }
    }
}

impl AudioSink for SimulatedSink {
    fn play(&mut self, track: &Track, volume: f32, on_idle: IdleSignal) -> Result<()> {
        self.send(Control::Stop);

        let (tx, rx) = mpsc::channel();
        let length = self.track_length;
        let title = track.title.clone();

        thread::Builder::new()
            .name(format!("sink-{}", on_idle.session()))
            .spawn(move || run_timer(&title, length, &rx, on_idle))
            .map_err(Error::upstream)?;

        self.control = Some(tx);
        self.volume = volume;
        Ok(())
    }

    fn stop(&mut self) {
        self.send(Control::Stop);
        self.control = None;
    }

    fn pause(&mut self) {
        self.send(Control::Pause);
    }

    fn resume(&mut self) {
        self.send(Control::Resume);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

fn run_timer(title: &str, length: Duration, control: &mpsc::Receiver<Control>, on_idle: IdleSignal) {
    let mut remaining = length;
    let mut paused = false;

    loop {
        if paused {
            match control.recv() {
                Ok(Control::Resume) => paused = false,
                Ok(Control::Pause) => {}
                Ok(Control::Stop) | Err(_) => break on_idle.fire(IdleReason::Stopped),
            }
            continue;
        }

        let started = Instant::now();
        match control.recv_timeout(remaining) {
            Ok(Control::Pause) => {
                remaining = remaining.saturating_sub(started.elapsed());
                paused = true;
            }
            Ok(Control::Resume) => {
                remaining = remaining.saturating_sub(started.elapsed());
            }
            Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => {
                break on_idle.fire(IdleReason::Stopped);
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!("Simulated playback of \"{title}\" finished");
                break on_idle.fire(IdleReason::Finished);
            }
        }
    }
}

/// Hands out [`SimulatedSink`]s.
#[derive(Debug, Clone)]
pub struct SimulatedSinkFactory {
    pub track_length: Duration,
}

impl SinkFactory for SimulatedSinkFactory {
    fn connect(&mut self, session: SessionId) -> Result<Box<dyn AudioSink>> {
        if self.track_length.is_zero() {
            warn!("Simulated track length is zero; session {session} will spin through its queue");
        }
        Ok(Box::new(SimulatedSink::new(self.track_length)))
    }
}

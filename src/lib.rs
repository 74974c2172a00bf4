//! Chat music bot core: a per-session play queue with history, loop mode and
//! volume, sequenced by a single-threaded event loop.
//!
//! Core modules:
//! - [`queue`] - Queue engine state machine (enqueue, advance, previous, loop)
//! - [`sequencer`] - Event loop that owns every session and chains tracks
//! - [`playlist`] - Named queue snapshots persisted as JSON
//! - [`command`] - Chat command parsing and replies
//!
//! ### Supporting Modules
//!
//! - [`track`] / [`session`] - Value types and the per-guild session registry
//! - [`sink`] / [`notify`] - Audio output and channel notice contracts
//! - [`sources`] / [`catalog`] - Track, lyrics, gif and quiz providers
//! - [`quiz`] - Music trivia questions
//! - [`console`] - Stdin/stdout stand-in for the chat platform
//! - [`config`] - Configuration and data directory management
//! - [`cli`] / [`completion`] - Command-line definitions and shell completions
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use zerr::catalog::Catalog;
//! use zerr::command::{Router, Services};
//! use zerr::notify::LogNotifier;
//! use zerr::playlist::PlaylistStore;
//! use zerr::sequencer::{self, SequencerConfig};
//! use zerr::sink::SimulatedSinkFactory;
//! use zerr::SessionId;
//!
//! let (handle, _join) = sequencer::spawn(
//!     SequencerConfig::default(),
//!     Box::new(SimulatedSinkFactory { track_length: std::time::Duration::from_secs(3) }),
//!     Arc::new(LogNotifier),
//! )?;
//! let store = PlaylistStore::open("playlists.json")?;
//! let catalog = Catalog::load(std::path::Path::new("catalog.json"))?;
//! let router = Router::new("!", handle, Arc::new(Mutex::new(store)), Services::from_provider(Arc::new(catalog)));
//!
//! for line in router.handle(SessionId(1), "!play blue monday") {
//!     println!("{line}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Sequencing
//!
//! The queue engine itself is pure: it never talks to audio or the network.
//! The sequencer starts tracks on an [`AudioSink`](sink::AudioSink), waits for
//! its idle signal, debounces for a short delay and then advances. Idle
//! signals carry a generation number so a late signal from an old resource
//! can never skip a track.
//!
//! ## Error Handling
//!
//! Library operations return [`Result`] with the typed [`Error`]. Command
//! handlers turn every error into a reply; nothing is fatal to the process.

pub mod catalog;
pub mod cli;
pub mod command;
pub mod completion;
pub mod config;
pub mod console;
pub mod error;
pub mod notify;
pub mod playlist;
pub mod queue;
pub mod quiz;
pub mod sequencer;
pub mod session;
pub mod sink;
pub mod sources;
pub mod track;

pub use error::{Error, ErrorKind, Result};
pub use queue::QueueEngine;
pub use session::SessionId;
pub use track::Track;

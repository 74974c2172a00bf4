//! # Command Router
//!
//! Turns a chat message into a [`Command`] and runs it against the
//! sequencer, the playlist store and the capability providers. Every command
//! produces the reply lines to post back to the channel; failures never
//! escape a handler.
//!
//! Messages must start with the configured prefix (`!` by default). Anything
//! else, and any unknown command word, is ignored.

use crate::error::{Error, ErrorKind};
use crate::playlist::PlaylistStore;
use crate::quiz;
use crate::sequencer::SequencerHandle;
use crate::session::SessionId;
use crate::sources::{GifProvider, LyricsProvider, Query, QuizSource, TrackSource};
use crate::track::Track;
use log::{debug, error};
use std::sync::{Arc, Mutex};

/// A parsed chat command with its raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Play(String),
    Pause,
    Resume,
    Skip,
    Previous,
    Loop,
    Unloop,
    Queue,
    Delete(String),
    Lyrics,
    Leave,
    Help,
    Shuffle,
    Volume(String),
    Quiz,
    SavePlaylist(String),
    LoadPlaylist(String),
    Gif(String),
    Playlists,
}

impl Command {
    /// Parse `message` if it is addressed to the bot.
    ///
    /// Command words are case-insensitive. `Play` and `Gif` take the whole
    /// remainder as argument; the other commands only take the first word.
    pub fn parse(prefix: &str, message: &str) -> Option<Self> {
        let body = message.trim().strip_prefix(prefix)?;
        let mut words = body.split_whitespace();
        let word = words.next()?.to_lowercase();
        let rest: Vec<&str> = words.collect();
        let all = rest.join(" ");
        let first = rest.first().map(|s| s.to_string()).unwrap_or_default();

        let command = match word.as_str() {
            "ping" => Command::Ping,
            "play" | "p" => Command::Play(all),
            "pause" | "stop" => Command::Pause,
            "resume" | "res" => Command::Resume,
            "skip" | "next" => Command::Skip,
            "previous" | "prev" => Command::Previous,
            "loop" => Command::Loop,
            "unloop" => Command::Unloop,
            "queue" | "q" => Command::Queue,
            "delete" => Command::Delete(first),
            "lyrics" => Command::Lyrics,
            "leave" => Command::Leave,
            "list" | "help" => Command::Help,
            "shuffle" => Command::Shuffle,
            "volume" => Command::Volume(first),
            "quiz" => Command::Quiz,
            "saveplaylist" => Command::SavePlaylist(first),
            "loadplaylist" => Command::LoadPlaylist(first),
            "gif" => Command::Gif(all),
            "playlists" => Command::Playlists,
            other => {
                debug!("Ignoring unknown command \"{other}\"");
                return None;
            }
        };
        Some(command)
    }
}

/// The outside services a router talks to.
#[derive(Clone)]
pub struct Services {
    pub tracks: Arc<dyn TrackSource>,
    pub lyrics: Arc<dyn LyricsProvider>,
    pub gifs: Arc<dyn GifProvider>,
    pub quiz: Arc<dyn QuizSource>,
}

impl Services {
    /// Use one provider for every capability.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: TrackSource + LyricsProvider + GifProvider + QuizSource + 'static,
    {
        Self {
            tracks: provider.clone(),
            lyrics: provider.clone(),
            gifs: provider.clone(),
            quiz: provider,
        }
    }
}

pub struct Router {
    prefix: String,
    sequencer: SequencerHandle,
    playlists: Arc<Mutex<PlaylistStore>>,
    services: Services,
}

impl Router {
    pub fn new(
        prefix: impl Into<String>,
        sequencer: SequencerHandle,
        playlists: Arc<Mutex<PlaylistStore>>,
        services: Services,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            sequencer,
            playlists,
            services,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Handle one chat message from `session`; returns the reply lines.
    ///
    /// Ignored messages produce no lines.
    pub fn handle(&self, session: SessionId, message: &str) -> Vec<String> {
        match Command::parse(&self.prefix, message) {
            Some(command) => {
                debug!("[{session}] {command:?}");
                self.run(session, command)
            }
            None => Vec::new(),
        }
    }

    /// Run an already parsed command.
    pub fn run(&self, session: SessionId, command: Command) -> Vec<String> {
        let seq = &self.sequencer;
        let reply = |text: &str| vec![text.to_string()];

        let result: crate::Result<Vec<String>> = match command {
            Command::Ping => Ok(reply("Pong! The bot is online and responsive.")),
            Command::Play(query) => Ok(self.play(session, &query)),
            Command::Pause => seq.call(move |s| s.pause(session)).map(|r| match r {
                Ok(()) => reply("Paused the music."),
                Err(_) => reply("I'm not connected to any voice channel."),
            }),
            Command::Resume => seq.call(move |s| s.resume(session)).map(|r| match r {
                Ok(()) => reply("Resumed the music."),
                Err(_) => reply("I'm not connected to any voice channel."),
            }),
            Command::Skip => seq.call(move |s| s.skip_next(session)).map(|r| match r {
                Ok(()) => reply("Skipped to the next song."),
                Err(_) => reply("Nothing is playing right now."),
            }),
            Command::Previous => seq.call(move |s| s.skip_previous(session)).map(|r| match r {
                Ok(_) => reply("Skipped to the previous song."),
                Err(_) => reply("No previous song to play."),
            }),
            Command::Loop => seq
                .call(move |s| s.set_loop(session, true))
                .map(|()| reply("Looping the entire queue.")),
            Command::Unloop => seq
                .call(move |s| s.set_loop(session, false))
                .map(|()| reply("Stopped looping the queue.")),
            Command::Queue => seq
                .call(move |s| (s.now_playing(session), s.snapshot_queue(session)))
                .map(|(current, queue)| queue_lines(current.as_ref(), &queue)),
            Command::Delete(arg) => match parse_position(&arg) {
                Some(index) => seq.call(move |s| s.delete_at(session, index)).map(|r| match r {
                    Ok(track) => vec![format!("Removed from queue: {track}")],
                    Err(_) => reply("Please provide a valid queue number."),
                }),
                None => Ok(reply("Please provide a valid queue number.")),
            },
            Command::Lyrics => Ok(self.lyrics(session)),
            Command::Leave => seq.call(move |s| s.leave(session)).map(|r| match r {
                Ok(()) => reply("Successfully left the voice channel."),
                Err(_) => reply("I'm not connected to any voice channel."),
            }),
            Command::Help => Ok(vec![help_text(&self.prefix)]),
            Command::Shuffle => seq
                .call(move |s| s.shuffle(session))
                .map(|()| reply("Shuffled the queue.")),
            Command::Volume(arg) => match parse_volume(&arg) {
                Some(percent) => seq
                    .call(move |s| s.set_volume(session, f32::from(percent) / 100.0))
                    .and_then(|r| r)
                    .map(|()| vec![format!("Set volume to {percent}%")]),
                None => Ok(reply("Please provide a volume level between 1 and 100.")),
            },
            Command::Quiz => Ok(self.quiz()),
            Command::SavePlaylist(name) => Ok(self.save_playlist(session, &name)),
            Command::LoadPlaylist(name) => Ok(self.load_playlist(session, &name)),
            Command::Gif(query) => Ok(self.gif(&query)),
            Command::Playlists => Ok(self.list_playlists()),
        };

        result.unwrap_or_else(|e| {
            error!("[{session}] Command failed: {e}");
            reply("An error occurred while processing the command.")
        })
    }

    fn play(&self, session: SessionId, query: &str) -> Vec<String> {
        if query.trim().is_empty() {
            return vec!["Please provide a valid URL or song name.".to_string()];
        }

        let classified = Query::classify(query);
        if classified.is_playlist() {
            return match self.services.tracks.resolve_playlist(query) {
                Ok(tracks) if tracks.is_empty() => {
                    vec!["No playable tracks found in that playlist.".to_string()]
                }
                Ok(tracks) => match self.sequencer.call(move |s| s.enqueue_many(session, tracks)) {
                    Ok(count) => vec![format!("Added {count} tracks to the queue.")],
                    Err(e) => failed(session, "playing the playlist", &e),
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    vec!["No matching playlist found.".to_string()]
                }
                Err(e) => failed(session, "playing the playlist", &e),
            };
        }

        match self.services.tracks.resolve(query) {
            Ok(track) => {
                let line = format!("Added to queue: {track}");
                match self.sequencer.call(move |s| s.enqueue(session, track)) {
                    Ok(()) => vec![line],
                    Err(e) => failed(session, "playing the track", &e),
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => vec!["No matching track found.".to_string()],
            Err(e) => failed(session, "playing the track", &e),
        }
    }

    fn lyrics(&self, session: SessionId) -> Vec<String> {
        let current = match self.sequencer.call(move |s| s.now_playing(session)) {
            Ok(Some(track)) => track,
            Ok(None) => return vec!["No song is currently playing.".to_string()],
            Err(e) => return failed(session, "fetching lyrics", &e),
        };

        match self.services.lyrics.fetch(&current.title, &current.artist) {
            Ok(lyrics) => vec![format!("Lyrics:\n{lyrics}")],
            Err(e) if e.kind() == ErrorKind::NotFound => vec!["No lyrics found.".to_string()],
            Err(e) => failed(session, "fetching lyrics", &e),
        }
    }

    fn quiz(&self) -> Vec<String> {
        match quiz::start_quiz(self.services.quiz.as_ref(), &mut rand::thread_rng()) {
            Ok(lines) => lines,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                vec!["Could not find a song for the quiz right now.".to_string()]
            }
            Err(e) => {
                error!("Error starting music quiz: {e}");
                vec!["An error occurred while starting the music quiz.".to_string()]
            }
        }
    }

    fn save_playlist(&self, session: SessionId, name: &str) -> Vec<String> {
        if name.trim().is_empty() {
            return vec!["Please provide a name for the playlist.".to_string()];
        }
        let tracks = match self.sequencer.call(move |s| s.snapshot_queue(session)) {
            Ok(tracks) => tracks,
            Err(e) => return failed(session, "saving the playlist", &e),
        };

        match self.with_store(|store| store.save(name, &tracks)) {
            Ok(()) => vec![format!("Playlist \"{name}\" saved.")],
            Err(Error::InvalidName) => vec!["Please provide a name for the playlist.".to_string()],
            Err(e) => failed(session, "saving the playlist", &e),
        }
    }

    fn load_playlist(&self, session: SessionId, name: &str) -> Vec<String> {
        if name.trim().is_empty() {
            return vec!["Please provide a valid playlist name.".to_string()];
        }
        let tracks = match self.with_store(|store| store.load(name)) {
            Ok(tracks) => tracks,
            Err(Error::NotFound(_)) => return vec!["Please provide a valid playlist name.".to_string()],
            Err(e) => return failed(session, "loading the playlist", &e),
        };

        match self.sequencer.call(move |s| s.load_snapshot(session, &tracks)) {
            Ok(()) => vec![format!("Playlist \"{name}\" loaded.")],
            Err(e) => failed(session, "loading the playlist", &e),
        }
    }

    fn list_playlists(&self) -> Vec<String> {
        match self.with_store(|store| Ok(store.summary())) {
            Ok(summary) if summary.is_empty() => vec!["No playlists saved yet.".to_string()],
            Ok(summary) => summary
                .into_iter()
                .map(|(name, count)| format!("{name} ({count} tracks)"))
                .collect(),
            Err(e) => {
                error!("Could not read playlists: {e}");
                vec!["An error occurred while listing playlists.".to_string()]
            }
        }
    }

    fn gif(&self, query: &str) -> Vec<String> {
        if query.trim().is_empty() {
            return vec!["Please provide a search term.".to_string()];
        }
        match self.services.gifs.search(query) {
            Ok(url) => vec![url],
            Err(e) if e.kind() == ErrorKind::NotFound => vec!["No GIF found.".to_string()],
            Err(e) => {
                error!("Error searching gifs: {e}");
                vec!["An error occurred while searching for a GIF.".to_string()]
            }
        }
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut PlaylistStore) -> crate::Result<T>) -> crate::Result<T> {
        let mut store = self
            .playlists
            .lock()
            .map_err(|_| Error::upstream("playlist store lock poisoned"))?;
        f(&mut store)
    }
}

fn failed(session: SessionId, action: &str, e: &Error) -> Vec<String> {
    error!("[{session}] Error {action}: {e}");
    vec![format!("An error occurred while {action}.")]
}

/// 1-based queue position to a 0-based index.
fn parse_position(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok()?.checked_sub(1)
}

/// Whole percent in 1..=100.
fn parse_volume(arg: &str) -> Option<u8> {
    arg.trim()
        .parse::<u8>()
        .ok()
        .filter(|v| (1..=100).contains(v))
}

fn queue_lines(current: Option<&Track>, queue: &[Track]) -> Vec<String> {
    if queue.is_empty() {
        return vec!["The queue is empty.".to_string()];
    }
    let mut lines = Vec::with_capacity(queue.len() + 1);
    if let Some(track) = current {
        lines.push(format!("Now Playing: {track}"));
    }
    lines.extend(
        queue
            .iter()
            .enumerate()
            .map(|(i, track)| format!("Queue #{}: {track}", i + 1)),
    );
    lines
}

fn help_text(prefix: &str) -> String {
    format!(
        "**Available Commands:**
- `ping`: Check if the bot is online and responsive.
- `play` or `p`: Play a song from a search, a video link, a track or playlist link.
- `pause` or `stop`: Pause the currently playing song.
- `resume` or `res`: Resume the paused song.
- `skip` or `next`: Skip to the next song in the queue.
- `previous` or `prev`: Skip to the previous song in the queue.
- `loop`: Toggle looping of the entire queue.
- `unloop`: Stop looping the queue.
- `queue` or `q`: Display the current queue.
- `delete`: Delete a song from the queue.
- `lyrics`: Get the lyrics of the currently playing song.
- `shuffle`: Shuffle the current queue.
- `volume`: Set the volume level (1-100).
- `quiz`: Start a music quiz.
- `saveplaylist`: Save the current queue as a playlist.
- `loadplaylist`: Load a saved playlist.
- `playlists`: List saved playlists.
- `gif`: Search for a GIF.
- `leave`: Make the bot leave the voice channel.

Usage: `{prefix}<command>`"
    )
}

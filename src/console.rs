//! # Console Front-End
//!
//! Stands in for the chat platform: each input line is one message, replies
//! are printed as they come back, and the sequencer posts its own notices
//! (now playing, queue empty) to the same output. Voice is simulated with
//! [`SimulatedSink`](crate::sink::SimulatedSink)s.
//!
//! A line may start with `@<guild> ` to address another voice session:
//!
//! ```text
//! !play blue monday
//! @2 !play hyperballad
//! @2 !queue
//! ```

use crate::catalog::Catalog;
use crate::command::{Router, Services};
use crate::config::BotConfig;
use crate::notify::WriterNotifier;
use crate::playlist::PlaylistStore;
use crate::sequencer;
use crate::session::SessionId;
use crate::sink::SimulatedSinkFactory;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

/// Split an optional `@<guild>` address off a line.
///
/// Lines whose first word is not a valid address go to `default`.
pub fn split_address(line: &str, default: SessionId) -> (SessionId, &str) {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix('@') else {
        return (default, line);
    };
    let (id, message) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match id.parse::<u64>() {
        Ok(id) => (SessionId(id), message),
        Err(_) => (default, line),
    }
}

/// Feed every line of `input` to `router` and print the replies.
///
/// Returns the number of messages that produced a reply.
pub fn run_lines<R: BufRead, W: Write>(
    router: &Router,
    default: SessionId,
    input: R,
    out: &mut W,
) -> Result<usize> {
    let mut answered = 0;
    for line in input.lines() {
        let line = line.context("Failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }

        let (session, message) = split_address(&line, default);
        let replies = router.handle(session, message);
        if replies.is_empty() {
            debug!("[{session}] No reply to {message:?}");
            continue;
        }

        answered += 1;
        for reply in replies {
            writeln!(out, "[{session}] {reply}").context("Failed to write reply")?;
        }
        out.flush().context("Failed to flush output")?;
    }
    Ok(answered)
}

/// Run the console bot on stdin/stdout until end of input.
pub fn start(config: &BotConfig, guild: u64) -> Result<()> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => {
            warn!("No catalog configured; every lookup will come back empty");
            Catalog::default()
        }
    };

    let playlists_path = config.playlists_path()?;
    let store = PlaylistStore::open(&playlists_path)
        .with_context(|| format!("Failed to open playlists at {}", playlists_path.display()))?;

    let (handle, join) = sequencer::spawn(
        config.sequencer(),
        Box::new(SimulatedSinkFactory {
            track_length: config.track_length(),
        }),
        Arc::new(WriterNotifier::new(io::stdout())),
    )?;

    let router = Router::new(
        config.prefix.clone(),
        handle.clone(),
        Arc::new(Mutex::new(store)),
        Services::from_provider(Arc::new(catalog)),
    );

    info!("Console bot ready, prefix \"{}\"", router.prefix());
    println!(
        "Zerr is listening. Type {}help for commands, end input to quit.",
        router.prefix()
    );

    let result = run_lines(&router, SessionId(guild), io::stdin().lock(), &mut io::stdout());

    handle.shutdown();
    join.join()
        .map_err(|_| anyhow::anyhow!("Sequencer thread panicked"))?;
    let answered = result?;
    info!("Console closed after {answered} commands");
    Ok(())
}

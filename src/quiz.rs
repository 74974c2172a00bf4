//! Music trivia: pick a random track from a [`QuizSource`] and ask about it.

use crate::error::{Error, Result};
use crate::sources::{QuizSource, QuizTrack};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

const QUESTIONS: [&str; 5] = [
    "What is the title of this song?",
    "Who is the artist of this song?",
    "In what year was this song released?",
    "What album does this song belong to?",
    "What genre does this song belong to?",
];

/// The question set for `track`, in random order.
///
/// A track without a title or without any artist yields no questions.
pub fn generate_questions<R: Rng + ?Sized>(track: &QuizTrack, rng: &mut R) -> Vec<&'static str> {
    if track.title.trim().is_empty() || track.artists.is_empty() {
        return Vec::new();
    }
    let mut questions = QUESTIONS.to_vec();
    questions.shuffle(rng);
    questions
}

/// Draw a track and return the chat lines for a new quiz round.
///
/// # Errors
///
/// - [`Error::NotFound`] if the source has no usable track.
/// - Whatever the source reports when it fails.
pub fn start_quiz<R: Rng + ?Sized>(source: &dyn QuizSource, rng: &mut R) -> Result<Vec<String>> {
    let tracks = source.random_tracks()?;
    let track = tracks
        .choose(rng)
        .ok_or_else(|| Error::NotFound("a song for the quiz".to_string()))?;
    debug!("Quiz round about \"{}\"", track.title);

    let questions = generate_questions(track, rng);
    if questions.is_empty() {
        return Err(Error::NotFound("a song for the quiz".to_string()));
    }

    Ok(questions
        .iter()
        .enumerate()
        .map(|(i, question)| format!("Question {}: {question}", i + 1))
        .collect())
}

//! Process-wide game configuration
//!
//! All timing and pacing knobs live in one immutable [`GameConfig`] value
//! constructed at startup and passed explicitly into every game. Defaults
//! mirror the classic pacing: 90 second rounds, a time-left notice every
//! 10 seconds, a 5 second pause between the 3 rounds of a game.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::{game::*, question::MAX_QUESTION_LIMIT};

/// Validates that a duration falls within an inclusive range of seconds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Immutable pacing and behavior settings for a game session
///
/// Validate with [`garde::Validate::validate`] before constructing games;
/// an invalid configuration is a caller bug, not something the engine
/// checks again at runtime.
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct GameConfig {
    /// Time budget of a single round
    #[garde(custom(validate_duration::<MIN_ROUND_DURATION, MAX_ROUND_DURATION>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub round_duration: Duration,
    /// Interval between best-effort time-left notices, shorter than the round
    #[garde(custom(validate_duration::<MIN_TICK_INTERVAL, MAX_TICK_INTERVAL>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub tick_interval: Duration,
    /// Pause between consecutive rounds
    #[garde(custom(validate_duration::<0, MAX_DELAY_BETWEEN_ROUNDS>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub delay_between_rounds: Duration,
    /// Whether a notice is sent when an answer matches no slot
    #[garde(skip)]
    pub notify_wrong_answer: bool,
    /// Number of rounds played per game
    #[garde(range(min = 1, max = MAX_ROUNDS_PER_GAME))]
    pub rounds_per_game: u32,
    /// Default size of the question pool a round draws from, overridable
    /// per channel through the persistence collaborator
    #[garde(range(min = 1, max = MAX_QUESTION_LIMIT))]
    pub default_question_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::from_secs(90),
            tick_interval: Duration::from_secs(10),
            delay_between_rounds: Duration::from_secs(5),
            notify_wrong_answer: false,
            rounds_per_game: 3,
            default_question_limit: 450,
        }
    }
}

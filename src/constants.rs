//! Configuration constants for the feud game system
//!
//! This module contains the limits used to validate game configuration,
//! keeping every boundary in one place.

/// Game pacing configuration constants
pub mod game {
    /// Minimum round duration in seconds
    pub const MIN_ROUND_DURATION: u64 = 5;
    /// Maximum round duration in seconds
    pub const MAX_ROUND_DURATION: u64 = 600;
    /// Minimum interval in seconds between time-left notices
    pub const MIN_TICK_INTERVAL: u64 = 1;
    /// Maximum interval in seconds between time-left notices
    pub const MAX_TICK_INTERVAL: u64 = 60;
    /// Maximum pause in seconds between consecutive rounds
    pub const MAX_DELAY_BETWEEN_ROUNDS: u64 = 60;
    /// Maximum number of rounds in a single game
    pub const MAX_ROUNDS_PER_GAME: u32 = 20;
}

/// Question selection configuration constants
pub mod question {
    /// Maximum size of the question pool a round may draw from
    pub const MAX_QUESTION_LIMIT: usize = 10_000;
}

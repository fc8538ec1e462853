//! Persistence collaborator
//!
//! Games do not talk to storage directly; they go through the
//! [`Persistence`] trait for session continuity (seed and rounds played),
//! per-channel configuration, saved scores and usage counters. One store is
//! shared by many concurrent game tasks, so every method takes `&self` and
//! implementations must be safe under concurrent updates.

use dashmap::DashMap;
use thiserror::Error;

use crate::{PlayerId, rank::Rank};

/// Errors surfaced by a persistence backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The backend could not produce session data for a channel
    #[error("channel session unavailable: {0}")]
    Unavailable(String),
}

/// Storage collaborator shared by all games
pub trait Persistence: Send + Sync {
    /// Returns the seed and total rounds already played for a channel
    ///
    /// Called once at game construction; the seed drives question
    /// selection for the whole game and the round count continues the
    /// channel's monotonic sequence across process restarts.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the session data cannot be produced, which
    /// prevents the game from being constructed at all.
    fn next_game_seed(&self, chan_id: &str) -> Result<(i64, u32), Error>;

    /// Records that a channel played one more round
    fn inc_rounds_played(&self, chan_id: &str);

    /// Looks up a per-channel configuration value
    fn channel_config(&self, chan_id: &str, key: &str) -> Option<String>;

    /// Saves one round's ranking for a channel
    fn save_score(&self, chan_id: &str, chan_name: &str, rank: &Rank);

    /// Increments a global usage counter
    fn inc_stats(&self, name: &str);

    /// Increments a per-channel usage counter
    fn inc_channel_stats(&self, chan_id: &str, name: &str);

    /// Increments a per-player usage counter
    fn inc_player_stats(&self, player_id: &PlayerId, name: &str);
}

/// An in-memory, concurrency-safe [`Persistence`] implementation
///
/// Seeds are minted lazily per channel and stable for the store's
/// lifetime. Used by tests and by embedders that do not need durable
/// storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    seeds: DashMap<String, i64>,
    rounds_played: DashMap<String, u32>,
    counters: DashMap<String, u64>,
    channel_counters: DashMap<(String, String), u64>,
    player_counters: DashMap<(PlayerId, String), u64>,
    channel_configs: DashMap<(String, String), String>,
    saved_scores: DashMap<String, Vec<Rank>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the seed handed to games on a channel (mainly for tests)
    pub fn set_seed(&self, chan_id: &str, seed: i64) {
        self.seeds.insert(chan_id.to_owned(), seed);
    }

    /// Sets a per-channel configuration value
    pub fn set_channel_config(&self, chan_id: &str, key: &str, value: &str) {
        self.channel_configs
            .insert((chan_id.to_owned(), key.to_owned()), value.to_owned());
    }

    /// Current value of a global counter
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).map_or(0, |c| *c)
    }

    /// Current value of a per-channel counter
    pub fn channel_counter(&self, chan_id: &str, name: &str) -> u64 {
        self.channel_counters
            .get(&(chan_id.to_owned(), name.to_owned()))
            .map_or(0, |c| *c)
    }

    /// Current value of a per-player counter
    pub fn player_counter(&self, player_id: &PlayerId, name: &str) -> u64 {
        self.player_counters
            .get(&(player_id.clone(), name.to_owned()))
            .map_or(0, |c| *c)
    }

    /// Total rounds recorded for a channel
    pub fn rounds_played(&self, chan_id: &str) -> u32 {
        self.rounds_played.get(chan_id).map_or(0, |c| *c)
    }

    /// Rankings saved for a channel, in save order
    pub fn saved_scores(&self, chan_id: &str) -> Vec<Rank> {
        self.saved_scores
            .get(chan_id)
            .map(|scores| scores.clone())
            .unwrap_or_default()
    }
}

impl Persistence for MemoryStore {
    fn next_game_seed(&self, chan_id: &str) -> Result<(i64, u32), Error> {
        let seed = *self
            .seeds
            .entry(chan_id.to_owned())
            .or_insert_with(|| fastrand::i64(..));
        Ok((seed, self.rounds_played(chan_id)))
    }

    fn inc_rounds_played(&self, chan_id: &str) {
        *self.rounds_played.entry(chan_id.to_owned()).or_insert(0) += 1;
    }

    fn channel_config(&self, chan_id: &str, key: &str) -> Option<String> {
        self.channel_configs
            .get(&(chan_id.to_owned(), key.to_owned()))
            .map(|v| v.clone())
    }

    fn save_score(&self, chan_id: &str, _chan_name: &str, rank: &Rank) {
        self.saved_scores
            .entry(chan_id.to_owned())
            .or_default()
            .push(rank.clone());
    }

    fn inc_stats(&self, name: &str) {
        *self.counters.entry(name.to_owned()).or_insert(0) += 1;
    }

    fn inc_channel_stats(&self, chan_id: &str, name: &str) {
        *self
            .channel_counters
            .entry((chan_id.to_owned(), name.to_owned()))
            .or_insert(0) += 1;
    }

    fn inc_player_stats(&self, player_id: &PlayerId, name: &str) {
        *self
            .player_counters
            .entry((player_id.clone(), name.to_owned()))
            .or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_stable_per_channel() {
        let store = MemoryStore::new();
        let (seed_a, _) = store.next_game_seed("chan").unwrap();
        let (seed_b, _) = store.next_game_seed("chan").unwrap();
        assert_eq!(seed_a, seed_b);
    }

    #[test]
    fn test_set_seed_pins_the_seed() {
        let store = MemoryStore::new();
        store.set_seed("chan", 42);
        assert_eq!(store.next_game_seed("chan").unwrap(), (42, 0));
    }

    #[test]
    fn test_rounds_played_continue_across_games() {
        let store = MemoryStore::new();
        store.inc_rounds_played("chan");
        store.inc_rounds_played("chan");
        let (_, played) = store.next_game_seed("chan").unwrap();
        assert_eq!(played, 2);
        assert_eq!(store.rounds_played("other"), 0);
    }

    #[test]
    fn test_counters_are_scoped() {
        let store = MemoryStore::new();
        let player = PlayerId::new("p1");
        store.inc_stats("game_started");
        store.inc_stats("game_started");
        store.inc_channel_stats("chan", "game_started");
        store.inc_player_stats(&player, "answer_correct");

        assert_eq!(store.counter("game_started"), 2);
        assert_eq!(store.channel_counter("chan", "game_started"), 1);
        assert_eq!(store.channel_counter("chan", "game_finished"), 0);
        assert_eq!(store.player_counter(&player, "answer_correct"), 1);
    }

    #[test]
    fn test_channel_config_lookup() {
        let store = MemoryStore::new();
        store.set_channel_config("chan", "question_limit", "100");
        assert_eq!(
            store.channel_config("chan", "question_limit").as_deref(),
            Some("100")
        );
        assert_eq!(store.channel_config("chan", "missing"), None);
        assert_eq!(store.channel_config("other", "question_limit"), None);
    }

    #[test]
    fn test_save_score_appends() {
        let store = MemoryStore::new();
        store.save_score("chan", "Channel", &Rank::default());
        store.save_score("chan", "Channel", &Rank::default());
        assert_eq!(store.saved_scores("chan").len(), 2);
    }
}

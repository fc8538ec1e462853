//! # Feud Game Library
//!
//! This library provides the core engine for a timed, round-based
//! "family feud" style trivia game. A question has several ranked answers,
//! each worth points; players submit free-text guesses over a chat channel;
//! the engine reveals matched answers live, tallies scores across a fixed
//! number of rounds, and concludes with a final ranking.
//!
//! The engine is transport-agnostic: a driver constructs a [`game::Game`]
//! bound to one inbound and one outbound channel, calls start, and from then
//! on only pushes player [`TextMessage`]s in and consumes [`Event`]s out.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub mod activity;
pub mod config;
pub mod constants;
pub mod game;
pub mod persistence;
pub mod question;
pub mod rank;
pub mod round;

/// Lifecycle state of a game and its rounds
///
/// The game state only ever advances; `RoundStarted`, `RoundTimeout` and
/// `RoundFinished` are round-scoped states echoed onto the game so that
/// observers see a single stream of transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum State {
    /// Constructed but not yet started
    Created,
    /// Game started, before the first round
    Started,
    /// A round is accepting answers
    RoundStarted,
    /// The current round ended because its deadline elapsed
    RoundTimeout,
    /// The current round ended (all answers found or timeout reported)
    RoundFinished,
    /// All rounds played, final ranking emitted
    Finished,
}

/// A stable identifier for a player, assigned by the chat platform
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player id from a platform-supplied identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A participant in the game
///
/// Identity is the [`PlayerId`]; the display name is whatever the platform
/// reported most recently and may change between messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Platform-assigned identifier
    pub id: PlayerId,
    /// Display name as last seen on the platform
    pub name: String,
}

impl Player {
    /// Creates a player from an id and display name
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The set of players seen by a game so far
///
/// The roster is owned by the game and lent mutably to each round; it grows
/// monotonically for the lifetime of the game, so a round's newly-seen
/// players are visible to later rounds and to the final ranking. Display
/// names are updated last-write-wins.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Roster {
    players: HashMap<PlayerId, Player>,
}

impl Roster {
    /// Registers a player, updating the display name if it changed
    pub fn register(&mut self, player: &Player) {
        self.players
            .entry(player.id.clone())
            .and_modify(|existing| existing.name.clone_from(&player.name))
            .or_insert_with(|| player.clone());
    }

    /// Returns the display name recorded for an id, if the player was seen
    pub fn name_of(&self, id: &PlayerId) -> Option<&str> {
        self.players.get(id).map(|p| p.name.as_str())
    }

    /// Whether the roster has seen this player
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Number of distinct players seen
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no player has been seen yet
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// A chat message submitted by a player
///
/// Produced by the transport adapter from platform events. The engine never
/// validates `chan_id` routing; callers must only deliver messages for the
/// channel the game is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMessage {
    /// Channel the message was posted in
    pub chan_id: String,
    /// The submitting player as reported by the platform
    pub player: Player,
    /// The raw message text, treated as an answer attempt
    pub text: String,
}

/// Events emitted by a game on its outbound channel
///
/// Every event carries the channel id of the emitting game. Within one
/// round, events are emitted in the exact order the triggering inputs were
/// processed; across rounds, round N fully precedes round N+1.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum Event {
    /// The game or round transitioned to a new state
    StateChange(game::StateChange),
    /// Best-effort periodic notice of remaining round time
    TimeLeft(game::TickNotice),
    /// A player's answer did not match any slot (only when enabled)
    WrongAnswer(game::WrongAnswerNotice),
    /// Snapshot of the question with per-slot claim status
    QuestionView(game::QuestionView),
    /// Cumulative ranking after a round
    Rank(game::RankUpdate),
}

impl Event {
    /// Converts the event to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// Panics if serialization fails, which cannot happen with the default
    /// JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_register_new_player() {
        let mut roster = Roster::default();
        roster.register(&Player::new("p1", "Alice"));

        assert!(roster.contains(&PlayerId::new("p1")));
        assert_eq!(roster.name_of(&PlayerId::new("p1")), Some("Alice"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_roster_name_last_write_wins() {
        let mut roster = Roster::default();
        roster.register(&Player::new("p1", "Alice"));
        roster.register(&Player::new("p1", "Alicia"));

        assert_eq!(roster.name_of(&PlayerId::new("p1")), Some("Alicia"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_roster_unknown_player() {
        let roster = Roster::default();
        assert!(roster.is_empty());
        assert_eq!(roster.name_of(&PlayerId::new("ghost")), None);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&State::RoundStarted).unwrap(),
            "\"roundStarted\""
        );
        assert_eq!(
            serde_json::to_string(&State::Finished).unwrap(),
            "\"finished\""
        );
    }

    #[test]
    fn test_event_to_message() {
        let event = Event::from(game::TickNotice {
            chan_id: "chan".to_string(),
            time_left: std::time::Duration::from_secs(30),
        });
        let json = event.to_message();

        assert!(json.contains("TimeLeft"));
        assert!(json.contains("30"));
    }
}

//! Cross-game player activity tracking
//!
//! A process usually runs one game task per channel; the
//! [`ActivityTracker`] is the one piece of player state shared across all
//! of them. It remembers when each player was last seen and reports how
//! many were active within a sliding window, for exposure as a gauge by
//! the embedding process.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::PlayerId;

/// Concurrent last-seen tracker with a fixed time-to-live
#[derive(Debug)]
pub struct ActivityTracker {
    seen: DashMap<PlayerId, Instant>,
    ttl: Duration,
}

impl ActivityTracker {
    /// Creates a tracker considering players active for `ttl` after their
    /// last message
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Records that a player was just seen
    pub fn touch(&self, player_id: &PlayerId) {
        self.seen.insert(player_id.clone(), Instant::now());
    }

    /// Whether a player was seen within the window
    pub fn is_active(&self, player_id: &PlayerId) -> bool {
        self.seen
            .get(player_id)
            .is_some_and(|seen| seen.elapsed() < self.ttl)
    }

    /// Number of players seen within the window
    ///
    /// Expired entries are pruned as a side effect, so the map does not
    /// grow without bound.
    pub fn active_count(&self) -> usize {
        self.seen.retain(|_, seen| seen.elapsed() < self.ttl);
        self.seen.len()
    }
}

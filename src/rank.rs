//! Ranking and score aggregation
//!
//! This module holds the leaderboard value types: [`PlayerScore`] for one
//! player's standing and [`Rank`] for an ordered set of them. A game keeps
//! one cumulative [`Rank`] and merges each round's ranking into it; merging
//! is commutative and associative in the scores, while positions are
//! re-derived on every materialization.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// One player's standing in a ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// The player this entry belongs to
    pub player_id: PlayerId,
    /// Display name at the time the entry was built
    pub name: String,
    /// Accumulated points
    pub score: u32,
    /// 1-based position after the most recent sort
    pub position: usize,
}

/// An ordered leaderboard, unique per player id
///
/// Entries are kept sorted by descending score. Equal scores are ordered by
/// ascending display name, then ascending player id, so the ordering is
/// fully deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(Vec<PlayerScore>);

impl Rank {
    /// Builds a rank from raw `(player, name, score)` entries
    ///
    /// Entries with duplicate player ids are summed. Positions are assigned
    /// after sorting.
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = (PlayerId, String, u32)>,
    {
        let mut lookup: HashMap<PlayerId, (String, u32)> = HashMap::new();
        for (id, name, score) in scores {
            lookup
                .entry(id)
                .and_modify(|(_, total)| *total += score)
                .or_insert((name, score));
        }
        Self::from_lookup(lookup)
    }

    /// Merges another ranking into this one, returning the combined rank
    ///
    /// Scores for matching player ids are summed; absent players are
    /// inserted. Display names from `other` win, so the cumulative rank
    /// follows name changes. Positions are re-assigned afterwards.
    pub fn add(&self, other: &Rank) -> Rank {
        let mut lookup: HashMap<PlayerId, (String, u32)> = self
            .0
            .iter()
            .map(|ps| (ps.player_id.clone(), (ps.name.clone(), ps.score)))
            .collect();

        for ps in &other.0 {
            lookup
                .entry(ps.player_id.clone())
                .and_modify(|(name, total)| {
                    name.clone_from(&ps.name);
                    *total += ps.score;
                })
                .or_insert((ps.name.clone(), ps.score));
        }

        Self::from_lookup(lookup)
    }

    fn from_lookup(lookup: HashMap<PlayerId, (String, u32)>) -> Self {
        let entries = lookup
            .into_iter()
            .map(|(player_id, (name, score))| PlayerScore {
                player_id,
                name,
                score,
                position: 0,
            })
            .sorted_by(|a, b| {
                b.score
                    .cmp(&a.score)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.player_id.cmp(&b.player_id))
            })
            .enumerate()
            .map(|(i, mut ps)| {
                ps.position = i + 1;
                ps
            })
            .collect();

        Self(entries)
    }

    /// Returns the entry for a player, if ranked
    pub fn score_of(&self, id: &PlayerId) -> Option<&PlayerScore> {
        self.0.iter().find(|ps| &ps.player_id == id)
    }

    /// Iterates entries in leaderboard order
    pub fn iter(&self) -> std::slice::Iter<'_, PlayerScore> {
        self.0.iter()
    }

    /// Number of ranked players
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody is ranked yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Rank {
    type Item = &'a PlayerScore;
    type IntoIter = std::slice::Iter<'a, PlayerScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

//! Question model and the question bank collaborator
//!
//! A [`Question`] carries an ordered list of ranked answers, usually
//! score-descending; the order is fixed for the question's lifetime and
//! claim slots are addressed by index into it. Questions are supplied by a
//! [`QuestionBank`], which owns selection and any sophisticated answer
//! normalization; the matcher implemented here is deliberately plain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ranked answer of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Canonical display text
    pub text: String,
    /// Points awarded to the player who claims this slot
    pub score: u32,
}

impl Answer {
    /// Creates an answer from display text and a point value
    pub fn new(text: impl Into<String>, score: u32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// A question with its ordered, ranked answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier within the bank
    pub id: u32,
    /// Display text shown at round start
    pub text: String,
    /// Ordered answer slots; order is significant and never changes
    pub answers: Vec<Answer>,
}

impl Question {
    /// Creates a question from an id, display text and answers
    pub fn new(id: u32, text: impl Into<String>, answers: Vec<Answer>) -> Self {
        Self {
            id,
            text: text.into(),
            answers,
        }
    }

    /// Matches submitted text against the answer slots
    ///
    /// Returns the index of the matching slot, or `None` if the text
    /// matches nothing. Matching is trimmed, case-insensitive equality;
    /// banks wanting fuzzier behavior should pre-normalize their answer
    /// text before handing questions out.
    pub fn check_answer(&self, text: &str) -> Option<usize> {
        let guess = text.trim().to_lowercase();
        if guess.is_empty() {
            return None;
        }
        self.answers
            .iter()
            .position(|answer| answer.text.trim().to_lowercase() == guess)
    }
}

/// Errors produced by a question bank
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuestionError {
    /// The bank has no question to offer within the requested pool
    #[error("no question available within limit {limit}")]
    Exhausted {
        /// The pool limit the selection was constrained to
        limit: usize,
    },
    /// The bank itself could not be reached or failed internally
    #[error("question bank unavailable: {0}")]
    Unavailable(String),
}

/// Supplies questions for rounds, deterministically per `(seed, round_index)`
///
/// The seed is fixed for a game's lifetime and the round index is the
/// game's monotonic total-rounds-played counter, so a bank must return the
/// identical question for the same pair, even across process restarts.
pub trait QuestionBank: Send + Sync {
    /// Selects the question for one round
    ///
    /// `limit` restricts selection to the first `limit` questions of the
    /// bank's pool (a per-channel difficulty knob).
    ///
    /// # Errors
    ///
    /// Returns a [`QuestionError`] if no question can be supplied; the game
    /// skips the affected round and moves on.
    fn next_question(&self, seed: i64, round_index: u32, limit: usize)
    -> Result<Question, QuestionError>;
}

/// An in-memory question bank with seeded deterministic selection
///
/// Useful for tests and for embedders that load their whole question set
/// into memory. Selection hashes the seed and round index into an RNG seed,
/// so a fixed pair always picks the same question.
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    questions: Vec<Question>,
}

impl MemoryBank {
    /// Creates a bank over the given questions
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Number of questions in the pool
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionBank for MemoryBank {
    fn next_question(
        &self,
        seed: i64,
        round_index: u32,
        limit: usize,
    ) -> Result<Question, QuestionError> {
        let pool = self.questions.len().min(limit);
        if pool == 0 {
            return Err(QuestionError::Exhausted { limit });
        }

        // Spread the round index across the seed space so consecutive
        // rounds do not pick adjacent questions.
        let mixed = (seed as u64) ^ u64::from(round_index).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = fastrand::Rng::with_seed(mixed);
        Ok(self.questions[rng.usize(..pool)].clone())
    }
}

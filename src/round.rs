//! Per-round answer bookkeeping
//!
//! A [`Round`] owns one question instance and tracks which answer slots
//! have been claimed and by whom. All of its state is touched from the
//! game's single round-loop task, which is what keeps the first-claim-wins
//! and completion checks race-free without locking.

use std::time::Duration;

use tokio::time::Instant;

use crate::{
    Player, PlayerId, Roster, State,
    game::{AnswerSlot, QuestionView},
    question::Question,
    rank::Rank,
};

/// Result of submitting one answer attempt to a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The round is no longer accepting answers; the attempt is a silent
    /// no-op, not an error (covers the deadline/in-flight-message race)
    Ignored,
    /// The text matched no slot
    Miss,
    /// The text matched a slot somebody already claimed; nothing changed
    AlreadyClaimed {
        /// Index of the previously claimed slot
        index: usize,
    },
    /// The text claimed a previously unclaimed slot for the player
    Claimed {
        /// Index of the newly claimed slot
        index: usize,
    },
}

impl AnswerOutcome {
    /// Whether the attempt matched a slot, newly claimed or not
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::AlreadyClaimed { .. } | Self::Claimed { .. })
    }
}

/// One question-answering phase with a fixed time budget
///
/// States advance `Created` → `RoundStarted` → `RoundFinished` and never
/// regress. `RoundFinished` is reached by exactly one of two paths:
/// every slot claimed, or the deadline elapsing first.
#[derive(Debug)]
pub struct Round {
    question: Question,
    state: State,
    /// Slot claimants, parallel to `question.answers`. Once a slot leaves
    /// `None` it never changes again.
    claims: Vec<Option<PlayerId>>,
    deadline: Instant,
}

impl Round {
    /// Creates a round over a question with the given time budget
    ///
    /// The absolute deadline is computed once, here; it does not move when
    /// the round is begun later.
    pub fn new(question: Question, duration: Duration) -> Self {
        let claims = vec![None; question.answers.len()];
        Self {
            question,
            state: State::Created,
            claims,
            deadline: Instant::now() + duration,
        }
    }

    /// Opens the round for answers
    pub fn begin(&mut self) {
        if self.state == State::Created {
            self.state = State::RoundStarted;
        }
    }

    /// Moves the round to its terminal state
    pub fn finish(&mut self) {
        self.state = State::RoundFinished;
    }

    /// Current round state
    pub fn state(&self) -> State {
        self.state
    }

    /// The question being played
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Absolute time at which the round times out
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Remaining time budget, clamped to zero, whole-second granularity
    pub fn time_left(&self) -> Duration {
        let left = self.deadline.saturating_duration_since(Instant::now());
        Duration::from_secs(left.as_secs())
    }

    /// Records one answer attempt
    ///
    /// Attempts outside `RoundStarted` are ignored. The player is
    /// registered in the roster on any attempt while the round is open,
    /// correct or not. Matching is delegated to the question; the first
    /// correct claim of a slot wins and later correct attempts report
    /// [`AnswerOutcome::AlreadyClaimed`] without changing anything.
    pub fn answer(&mut self, roster: &mut Roster, player: &Player, text: &str) -> AnswerOutcome {
        if self.state != State::RoundStarted {
            return AnswerOutcome::Ignored;
        }

        roster.register(player);

        let Some(index) = self.question.check_answer(text) else {
            return AnswerOutcome::Miss;
        };

        if self.claims[index].is_some() {
            return AnswerOutcome::AlreadyClaimed { index };
        }

        self.claims[index] = Some(player.id.clone());
        AnswerOutcome::Claimed { index }
    }

    /// Whether every slot has been claimed
    ///
    /// This can only become true immediately after a successful new claim,
    /// so callers re-check it after [`Round::answer`] rather than polling.
    pub fn finished(&self) -> bool {
        self.claims.iter().all(Option::is_some)
    }

    /// The player holding a slot, if claimed
    pub fn claimant(&self, index: usize) -> Option<&PlayerId> {
        self.claims.get(index).and_then(Option::as_ref)
    }

    /// Builds an immutable snapshot of the question and its claim status
    ///
    /// `show_unanswered` asks the renderer to also reveal the text of
    /// never-claimed slots; it is only set on the view emitted at round
    /// end. Highlighting of a just-solved slot is applied by the caller on
    /// the returned view.
    pub fn question_view(
        &self,
        roster: &Roster,
        chan_id: &str,
        round_number: u32,
        show_unanswered: bool,
    ) -> QuestionView {
        let answers = self
            .question
            .answers
            .iter()
            .zip(&self.claims)
            .map(|(answer, claim)| AnswerSlot {
                text: answer.text.clone(),
                score: answer.score,
                answered: claim.is_some(),
                answered_by: claim
                    .as_ref()
                    .and_then(|id| roster.name_of(id))
                    .map(str::to_owned),
                highlight: false,
            })
            .collect();

        QuestionView {
            chan_id: chan_id.to_owned(),
            round: round_number,
            question_id: self.question.id,
            question_text: self.question.text.clone(),
            answers,
            show_unanswered,
            time_left: self.time_left(),
        }
    }

    /// Produces this round's ranking from the claimed slots
    ///
    /// Claimed slots are grouped by player and their scores summed; the
    /// resulting entries are ordered and positioned by [`Rank`].
    pub fn ranking(&self, roster: &Roster) -> Rank {
        Rank::from_scores(
            self.claims
                .iter()
                .zip(&self.question.answers)
                .filter_map(|(claim, answer)| {
                    claim.as_ref().map(|id| {
                        let name = roster.name_of(id).unwrap_or_default().to_owned();
                        (id.clone(), name, answer.score)
                    })
                }),
        )
    }
}

//! Game lifecycle and the sequential round loop
//!
//! This module contains the main [`Game`] struct: it owns the sequence of
//! rounds for one chat channel, the player roster, the running cumulative
//! rank, and the round loop that multiplexes player messages, periodic
//! time-left ticks and the round deadline into one strictly sequential
//! task. Exactly one of the three event sources is handled at a time,
//! fully, which is what makes the claim and completion checks race-free
//! without locks.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    Event, Roster, State, TextMessage,
    activity::ActivityTracker,
    config::GameConfig,
    persistence::{self, Persistence},
    question::{QuestionBank, QuestionError},
    rank::Rank,
    round::{AnswerOutcome, Round},
};

/// Key of the per-channel question pool override in the persistence store
const QUESTION_LIMIT_KEY: &str = "question_limit";

/// Notification that the game or round state changed
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct StateChange {
    /// Channel the game is bound to
    pub chan_id: String,
    /// The state just entered
    pub state: State,
    /// Round number for round-scoped states
    pub round: Option<u32>,
    /// Question snapshot, present on round start
    pub question: Option<QuestionView>,
}

/// Best-effort notice of the remaining round time
///
/// Delivered only if the outbound channel can accept it immediately;
/// otherwise silently dropped, never queued.
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
pub struct TickNotice {
    /// Channel the game is bound to
    pub chan_id: String,
    /// Remaining round time, whole seconds
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub time_left: Duration,
}

/// Notice that an answer matched no slot, sent only when enabled
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
pub struct WrongAnswerNotice {
    /// Channel the game is bound to
    pub chan_id: String,
    /// Remaining round time, whole seconds
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub time_left: Duration,
}

/// One answer slot within a [`QuestionView`]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct AnswerSlot {
    /// Canonical answer text; renderers hide it for unclaimed slots
    /// unless the view says otherwise
    pub text: String,
    /// Points the slot is worth
    pub score: u32,
    /// Whether the slot has been claimed
    pub answered: bool,
    /// Display name of the claimant, if claimed
    pub answered_by: Option<String>,
    /// Set on the single slot that was just solved
    pub highlight: bool,
}

/// Immutable snapshot of the question and its claim status
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
pub struct QuestionView {
    /// Channel the game is bound to
    pub chan_id: String,
    /// Round number this view belongs to
    pub round: u32,
    /// Stable question identifier
    pub question_id: u32,
    /// Question display text
    pub question_text: String,
    /// Per-slot snapshots, in the question's fixed answer order
    pub answers: Vec<AnswerSlot>,
    /// Whether renderers should reveal never-claimed slot text
    /// (set only on the view emitted at round end)
    pub show_unanswered: bool,
    /// Remaining round time, whole seconds
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub time_left: Duration,
}

/// Cumulative ranking emitted after each round
#[derive(Debug, Serialize, Clone)]
pub struct RankUpdate {
    /// Channel the game is bound to
    pub chan_id: String,
    /// Round number the update follows
    pub round: u32,
    /// The cumulative rank across all rounds played so far
    pub rank: Rank,
    /// True only on the last round of the game
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// Errors that prevent a game from being constructed
///
/// Per-round problems (an unavailable question, a malformed limit
/// override) never surface here; they degrade to skipping the affected
/// round so the game always progresses through its fixed round count.
#[derive(Error, Debug)]
pub enum GameError {
    /// The persistence collaborator could not produce session data
    #[error("loading session for channel {chan_id} failed: {source}")]
    Persistence {
        /// Channel whose session lookup failed
        chan_id: String,
        /// The underlying store error
        source: persistence::Error,
    },
}

/// A play session of several rounds on one chat channel
///
/// Constructed bound to one inbound and one outbound channel; after
/// [`Game::start`] the caller only communicates by pushing
/// [`TextMessage`]s in and consuming [`Event`]s out.
pub struct Game {
    config: GameConfig,
    chan_id: String,
    chan_name: String,
    state: State,
    total_rounds_played: u32,
    players: Roster,
    seed: i64,
    rank: Rank,
    bank: Arc<dyn QuestionBank>,
    store: Arc<dyn Persistence>,
    activity: Option<Arc<ActivityTracker>>,
    incoming: mpsc::Receiver<TextMessage>,
    outgoing: mpsc::Sender<Event>,
}

impl Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("chan_id", &self.chan_id)
            .field("state", &self.state)
            .field("seed", &self.seed)
            .field("total_rounds_played", &self.total_rounds_played)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a game bound to a channel and its message channel pair
    ///
    /// Obtains the seed and the channel's running round counter from the
    /// persistence collaborator; the seed is fixed for the lifetime of
    /// the game and drives question selection for all its rounds.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Persistence`] if the store cannot produce the
    /// session data; no game is created in that case.
    pub fn new(
        config: GameConfig,
        chan_id: impl Into<String>,
        chan_name: impl Into<String>,
        bank: Arc<dyn QuestionBank>,
        store: Arc<dyn Persistence>,
        incoming: mpsc::Receiver<TextMessage>,
        outgoing: mpsc::Sender<Event>,
    ) -> Result<Self, GameError> {
        let chan_id = chan_id.into();
        let (seed, total_rounds_played) =
            store
                .next_game_seed(&chan_id)
                .map_err(|source| GameError::Persistence {
                    chan_id: chan_id.clone(),
                    source,
                })?;

        Ok(Self {
            config,
            chan_id,
            chan_name: chan_name.into(),
            state: State::Created,
            total_rounds_played,
            players: Roster::default(),
            seed,
            rank: Rank::default(),
            bank,
            store,
            activity: None,
            incoming,
            outgoing,
        })
    }

    /// Attaches a shared cross-game activity tracker
    ///
    /// Every processed player message marks the player active.
    #[must_use]
    pub fn with_activity(mut self, tracker: Arc<ActivityTracker>) -> Self {
        self.activity = Some(tracker);
        self
    }

    /// Channel the game is bound to
    pub fn chan_id(&self) -> &str {
        &self.chan_id
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// The seed driving question selection for this game
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// The channel's monotonic round counter, including past games
    pub fn total_rounds_played(&self) -> u32 {
        self.total_rounds_played
    }

    /// Players seen so far, across all rounds of this game
    pub fn roster(&self) -> &Roster {
        &self.players
    }

    /// The cumulative rank merged over all finished rounds
    pub fn cumulative_rank(&self) -> &Rank {
        &self.rank
    }

    /// Starts the game on its own task
    ///
    /// Non-blocking to the caller; the returned handle resolves to the
    /// game once it reaches `Finished`, for final-state inspection.
    pub fn start(mut self) -> JoinHandle<Game> {
        tokio::spawn(async move {
            self.run().await;
            self
        })
    }

    /// Runs the game to completion on the current task
    ///
    /// Plays the configured number of rounds sequentially. A round that
    /// fails to start is logged and skipped; the ranking event for its
    /// round number is still emitted so observers always see exactly one
    /// ranking per scheduled round, the last tagged final.
    pub async fn run(&mut self) {
        self.state = State::Started;
        info!(
            chan_id = %self.chan_id,
            seed = self.seed,
            total_rounds_played = self.total_rounds_played,
            "game started"
        );
        emit(
            &self.outgoing,
            StateChange {
                chan_id: self.chan_id.clone(),
                state: State::Started,
                round: None,
                question: None,
            }
            .into(),
        )
        .await;
        self.store.inc_stats("game_started");
        self.store.inc_channel_stats(&self.chan_id, "game_started");

        let rounds = self.config.rounds_per_game;
        for round_number in 1..=rounds {
            if let Err(error) = self.play_round(round_number).await {
                warn!(chan_id = %self.chan_id, %error, "starting round failed");
            }
            let is_final = round_number == rounds;
            emit(
                &self.outgoing,
                RankUpdate {
                    chan_id: self.chan_id.clone(),
                    round: round_number,
                    rank: self.rank.clone(),
                    is_final,
                }
                .into(),
            )
            .await;
            if !is_final {
                tokio::time::sleep(self.config.delay_between_rounds).await;
            }
        }

        self.store.inc_stats("game_finished");
        self.store.inc_channel_stats(&self.chan_id, "game_finished");
        self.state = State::Finished;
        emit(
            &self.outgoing,
            StateChange {
                chan_id: self.chan_id.clone(),
                state: State::Finished,
                round: None,
                question: None,
            }
            .into(),
        )
        .await;
        info!(chan_id = %self.chan_id, "game finished");
    }

    /// Plays a single round to one of its two terminal conditions
    ///
    /// The loop awaits exactly one of three event sources at a time:
    /// a player message, the periodic tick, or the deadline. Timers are
    /// dropped with the round on both finalize paths, so a stale timeout
    /// can never fire for a round that already completed.
    async fn play_round(&mut self, round_number: u32) -> Result<(), QuestionError> {
        self.total_rounds_played += 1;
        self.store.inc_rounds_played(&self.chan_id);

        let limit = self
            .store
            .channel_config(&self.chan_id, QUESTION_LIMIT_KEY)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(self.config.default_question_limit);

        let question = self
            .bank
            .next_question(self.seed, self.total_rounds_played, limit)?;
        let mut round = Round::new(question, self.config.round_duration);
        self.store.inc_stats("round_started");
        self.store.inc_channel_stats(&self.chan_id, "round_started");

        round.begin();
        self.state = State::RoundStarted;
        let opening_view = round.question_view(&self.players, &self.chan_id, round_number, false);
        emit(
            &self.outgoing,
            StateChange {
                chan_id: self.chan_id.clone(),
                state: State::RoundStarted,
                round: Some(round_number),
                question: Some(opening_view),
            }
            .into(),
        )
        .await;
        info!(chan_id = %self.chan_id, question_limit = limit, round = round_number, "round started");

        let deadline = tokio::time::sleep_until(round.deadline());
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        let mut inbound_open = true;

        // Disjoint field borrows for the select arms and their bodies.
        let Self {
            chan_id,
            chan_name,
            config,
            state,
            players,
            rank,
            store,
            activity,
            incoming,
            outgoing,
            ..
        } = self;

        loop {
            tokio::select! {
                message = incoming.recv(), if inbound_open => {
                    let Some(message) = message else {
                        // Producer dropped the inbound channel; the round
                        // still runs out its clock.
                        debug!(chan_id = %chan_id, "inbound channel closed");
                        inbound_open = false;
                        continue;
                    };

                    if let Some(tracker) = activity.as_ref() {
                        tracker.touch(&message.player.id);
                    }
                    debug!(chan_id = %chan_id, player_id = %message.player.id, "round loop got message");

                    match round.answer(players, &message.player, &message.text) {
                        AnswerOutcome::Ignored => {}
                        AnswerOutcome::Miss => {
                            if config.notify_wrong_answer {
                                emit(outgoing, WrongAnswerNotice {
                                    chan_id: chan_id.clone(),
                                    time_left: round.time_left(),
                                }.into()).await;
                            }
                        }
                        AnswerOutcome::AlreadyClaimed { index } => {
                            debug!(chan_id = %chan_id, index, "answer already claimed");
                        }
                        AnswerOutcome::Claimed { index } => {
                            store.inc_stats("answer_correct");
                            store.inc_channel_stats(chan_id, "answer_correct");
                            store.inc_player_stats(&message.player.id, "answer_correct");

                            let mut view = round.question_view(players, chan_id, round_number, false);
                            view.answers[index].highlight = true;
                            emit(outgoing, view.into()).await;
                            info!(
                                chan_id = %chan_id,
                                player_id = %message.player.id,
                                player_name = %message.player.name,
                                question_id = round.question().id,
                                "answer correct"
                            );

                            if round.finished() {
                                round.finish();
                                *state = State::RoundFinished;
                                merge_round_rank(rank, &round, players, store, chan_id, chan_name);
                                emit(outgoing, StateChange {
                                    chan_id: chan_id.clone(),
                                    state: State::RoundFinished,
                                    round: Some(round_number),
                                    question: None,
                                }.into()).await;
                                store.inc_stats("round_finished");
                                store.inc_channel_stats(chan_id, "round_finished");
                                info!(chan_id = %chan_id, timeout = false, round = round_number, "round finished");
                                return Ok(());
                            }
                        }
                    }
                }

                _ = ticker.tick() => {
                    // Advisory only: dropped, never queued, when the
                    // observer is not ready.
                    let _ = outgoing.try_send(TickNotice {
                        chan_id: chan_id.clone(),
                        time_left: round.time_left(),
                    }.into());
                }

                () = &mut deadline => {
                    round.finish();
                    *state = State::RoundTimeout;
                    merge_round_rank(rank, &round, players, store, chan_id, chan_name);
                    emit(outgoing, StateChange {
                        chan_id: chan_id.clone(),
                        state: State::RoundTimeout,
                        round: Some(round_number),
                        question: None,
                    }.into()).await;
                    emit(
                        outgoing,
                        round.question_view(players, chan_id, round_number, true).into(),
                    ).await;
                    store.inc_stats("round_timeout");
                    store.inc_channel_stats(chan_id, "round_timeout");
                    info!(chan_id = %chan_id, timeout = true, round = round_number, "round finished");
                    return Ok(());
                }
            }
        }
    }
}

/// Merges a finished round's ranking into the cumulative rank and persists
/// the per-round delta
fn merge_round_rank(
    rank: &mut Rank,
    round: &Round,
    players: &Roster,
    store: &Arc<dyn Persistence>,
    chan_id: &str,
    chan_name: &str,
) {
    let round_rank = round.ranking(players);
    *rank = rank.add(&round_rank);
    store.save_score(chan_id, chan_name, &round_rank);
}

/// Sends an event, tolerating a closed outbound channel
///
/// Observers going away must not terminate the round loop; the game keeps
/// playing and the events fall on the floor.
async fn emit(outgoing: &mpsc::Sender<Event>, event: Event) {
    if outgoing.send(event).await.is_err() {
        debug!("outbound channel closed, event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Player, PlayerId,
        persistence::MemoryStore,
        question::{Answer, MemoryBank, Question},
    };

    fn create_test_bank() -> Arc<MemoryBank> {
        Arc::new(MemoryBank::new(vec![Question::new(
            1,
            "Name a primary color",
            vec![Answer::new("Red", 30), Answer::new("Blue", 20)],
        )]))
    }

    fn create_test_config(rounds: u32) -> GameConfig {
        GameConfig {
            rounds_per_game: rounds,
            ..GameConfig::default()
        }
    }

    fn create_test_game(
        config: GameConfig,
        bank: Arc<MemoryBank>,
    ) -> (
        Game,
        mpsc::Sender<TextMessage>,
        mpsc::Receiver<Event>,
        Arc<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        store.set_seed("chan", 42);
        let (in_tx, in_rx) = mpsc::channel(64);
        let (out_tx, out_rx) = mpsc::channel(256);
        let game = Game::new(
            config,
            "chan",
            "Test Channel",
            bank,
            store.clone(),
            in_rx,
            out_tx,
        )
        .unwrap();
        (game, in_tx, out_rx, store)
    }

    fn text(player: &Player, text: &str) -> TextMessage {
        TextMessage {
            chan_id: "chan".to_string(),
            player: player.clone(),
            text: text.to_string(),
        }
    }

    /// Drains events until the final `Finished` state change, exclusive of
    /// best-effort tick notices
    async fn collect_until_finished(out_rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = out_rx.recv().await {
            let done =
                matches!(&event, Event::StateChange(sc) if sc.state == State::Finished);
            if !matches!(event, Event::TimeLeft(_)) {
                events.push(event);
            }
            if done {
                break;
            }
        }
        events
    }

    fn rank_updates(events: &[Event]) -> Vec<&RankUpdate> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Rank(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    fn states(events: &[Event]) -> Vec<State> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::StateChange(sc) => Some(sc.state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_new_game_starts_created() {
        let (game, _in_tx, _out_rx, _store) =
            create_test_game(create_test_config(3), create_test_bank());

        assert_eq!(game.state(), State::Created);
        assert_eq!(game.seed(), 42);
        assert_eq!(game.total_rounds_played(), 0);
        assert!(game.roster().is_empty());
        assert!(game.cumulative_rank().is_empty());
    }

    #[test]
    fn test_construction_fails_on_persistence_error() {
        struct FailingStore;
        impl Persistence for FailingStore {
            fn next_game_seed(&self, _chan_id: &str) -> Result<(i64, u32), persistence::Error> {
                Err(persistence::Error::Unavailable("db down".to_string()))
            }
            fn inc_rounds_played(&self, _chan_id: &str) {}
            fn channel_config(&self, _chan_id: &str, _key: &str) -> Option<String> {
                None
            }
            fn save_score(&self, _chan_id: &str, _chan_name: &str, _rank: &Rank) {}
            fn inc_stats(&self, _name: &str) {}
            fn inc_channel_stats(&self, _chan_id: &str, _name: &str) {}
            fn inc_player_stats(&self, _player_id: &PlayerId, _name: &str) {}
        }

        let (_in_tx, in_rx) = mpsc::channel(1);
        let (out_tx, _out_rx) = mpsc::channel(1);
        let result = Game::new(
            create_test_config(3),
            "chan",
            "Test Channel",
            create_test_bank(),
            Arc::new(FailingStore),
            in_rx,
            out_tx,
        );

        assert!(matches!(
            result,
            Err(GameError::Persistence { chan_id, .. }) if chan_id == "chan"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_of_unanswered_rounds_times_out() {
        let (game, _in_tx, mut out_rx, store) =
            create_test_game(create_test_config(2), create_test_bank());

        let handle = game.start();
        let events = collect_until_finished(&mut out_rx).await;
        let game = handle.await.unwrap();

        assert_eq!(game.state(), State::Finished);
        assert_eq!(game.total_rounds_played(), 2);

        let updates = rank_updates(&events);
        assert_eq!(updates.len(), 2);
        assert!(!updates[0].is_final);
        assert!(updates[1].is_final);
        assert_eq!(updates[1].round, 2);

        let states = states(&events);
        assert_eq!(
            states,
            vec![
                State::Started,
                State::RoundStarted,
                State::RoundTimeout,
                State::RoundStarted,
                State::RoundTimeout,
                State::Finished,
            ]
        );

        // Timeout reveal: final view of each round shows unanswered slots
        let reveals: Vec<&QuestionView> = events
            .iter()
            .filter_map(|e| match e {
                Event::QuestionView(view) if view.show_unanswered => Some(view),
                _ => None,
            })
            .collect();
        assert_eq!(reveals.len(), 2);
        assert!(reveals.iter().all(|v| v.answers.iter().all(|s| !s.answered)));

        assert_eq!(store.counter("game_started"), 1);
        assert_eq!(store.counter("game_finished"), 1);
        assert_eq!(store.counter("round_started"), 2);
        assert_eq!(store.counter("round_timeout"), 2);
        assert_eq!(store.counter("round_finished"), 0);
        assert_eq!(store.channel_counter("chan", "round_timeout"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_answered_round_finishes_early() {
        let (game, in_tx, mut out_rx, store) =
            create_test_game(create_test_config(1), create_test_bank());
        let alice = Player::new("p1", "Alice");
        let bob = Player::new("p2", "Bob");

        let handle = game.start();
        in_tx.send(text(&alice, "red")).await.unwrap();
        in_tx.send(text(&bob, "blue")).await.unwrap();

        let events = collect_until_finished(&mut out_rx).await;
        let game = handle.await.unwrap();

        assert_eq!(game.state(), State::Finished);
        assert!(game.roster().contains(&alice.id));
        assert!(game.roster().contains(&bob.id));

        let states = states(&events);
        assert_eq!(
            states,
            vec![
                State::Started,
                State::RoundStarted,
                State::RoundFinished,
                State::Finished,
            ]
        );

        // One reveal view per new claim, with exactly the solved slot
        // highlighted
        let views: Vec<&QuestionView> = events
            .iter()
            .filter_map(|e| match e {
                Event::QuestionView(view) => Some(view),
                _ => None,
            })
            .collect();
        assert_eq!(views.len(), 2);
        assert!(views[0].answers[0].highlight);
        assert!(!views[0].answers[1].highlight);
        assert_eq!(views[0].answers[0].answered_by.as_deref(), Some("Alice"));
        assert!(!views[1].answers[0].highlight);
        assert!(views[1].answers[1].highlight);
        assert!(views.iter().all(|v| !v.show_unanswered));

        let updates = rank_updates(&events);
        assert_eq!(updates.len(), 1);
        assert!(updates[0].is_final);
        let rank = &updates[0].rank;
        assert_eq!(rank.score_of(&alice.id).unwrap().score, 30);
        assert_eq!(rank.score_of(&alice.id).unwrap().position, 1);
        assert_eq!(rank.score_of(&bob.id).unwrap().score, 20);
        assert_eq!(rank.score_of(&bob.id).unwrap().position, 2);

        assert_eq!(store.counter("round_finished"), 1);
        assert_eq!(store.counter("round_timeout"), 0);
        assert_eq!(store.counter("answer_correct"), 2);
        assert_eq!(store.player_counter(&alice.id, "answer_correct"), 1);
        assert_eq!(store.saved_scores("chan").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_and_duplicate_answers() {
        let config = GameConfig {
            notify_wrong_answer: true,
            ..create_test_config(1)
        };
        let (game, in_tx, mut out_rx, store) = create_test_game(config, create_test_bank());
        let alice = Player::new("p1", "Alice");
        let bob = Player::new("p2", "Bob");

        let handle = game.start();
        in_tx.send(text(&alice, "purple")).await.unwrap();
        in_tx.send(text(&alice, "red")).await.unwrap();
        in_tx.send(text(&bob, "red")).await.unwrap();
        in_tx.send(text(&bob, "blue")).await.unwrap();

        let events = collect_until_finished(&mut out_rx).await;
        handle.await.unwrap();

        let wrong_count = events
            .iter()
            .filter(|e| matches!(e, Event::WrongAnswer(_)))
            .count();
        assert_eq!(wrong_count, 1);

        // Three correct submissions, but only two new claims: the
        // duplicate produced no view
        let view_count = events
            .iter()
            .filter(|e| matches!(e, Event::QuestionView(_)))
            .count();
        assert_eq!(view_count, 2);
        assert_eq!(store.counter("answer_correct"), 2);

        // First claimant kept
        let final_rank = rank_updates(&events)[0];
        assert_eq!(final_rank.rank.score_of(&alice.id).unwrap().score, 30);
        assert_eq!(final_rank.rank.score_of(&bob.id).unwrap().score, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_question_skips_round() {
        let (game, _in_tx, mut out_rx, store) =
            create_test_game(create_test_config(2), Arc::new(MemoryBank::default()));

        let handle = game.start();
        let events = collect_until_finished(&mut out_rx).await;
        let game = handle.await.unwrap();

        // No round ever started, but the game progressed through its
        // schedule and emitted one ranking per scheduled round
        assert_eq!(game.state(), State::Finished);
        let updates = rank_updates(&events);
        assert_eq!(updates.len(), 2);
        assert!(updates[0].rank.is_empty());
        assert!(updates[1].is_final);
        assert_eq!(states(&events), vec![State::Started, State::Finished]);

        assert_eq!(store.counter("round_started"), 0);
        assert_eq!(store.counter("game_finished"), 1);
        assert_eq!(store.rounds_played("chan"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_question_limit_override() {
        let bank = Arc::new(MemoryBank::new(
            (0..10)
                .map(|i| {
                    Question::new(i, format!("question {i}"), vec![Answer::new("answer", 10)])
                })
                .collect(),
        ));
        let (game, _in_tx, mut out_rx, store) =
            create_test_game(create_test_config(1), bank);
        store.set_channel_config("chan", QUESTION_LIMIT_KEY, "1");

        let handle = game.start();
        let events = collect_until_finished(&mut out_rx).await;
        handle.await.unwrap();

        let opening = events
            .iter()
            .find_map(|e| match e {
                Event::StateChange(sc) if sc.state == State::RoundStarted => {
                    sc.question.as_ref()
                }
                _ => None,
            })
            .unwrap();
        // Pool limited to the first question only
        assert_eq!(opening.question_id, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_tracker_sees_players() {
        let tracker = Arc::new(ActivityTracker::new(Duration::from_secs(300)));
        let (game, in_tx, mut out_rx, _store) =
            create_test_game(create_test_config(1), create_test_bank());
        let game = game.with_activity(tracker.clone());
        let alice = Player::new("p1", "Alice");

        let handle = game.start();
        in_tx.send(text(&alice, "nope")).await.unwrap();
        in_tx.send(text(&alice, "red")).await.unwrap();
        in_tx.send(text(&alice, "blue")).await.unwrap();

        collect_until_finished(&mut out_rx).await;
        handle.await.unwrap();

        assert!(tracker.is_active(&alice.id));
        assert_eq!(tracker.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_notices_are_emitted_during_idle_round() {
        // Round length deliberately not a multiple of the tick interval,
        // so the deadline and a tick never race
        let config = GameConfig {
            round_duration: Duration::from_secs(45),
            tick_interval: Duration::from_secs(10),
            ..create_test_config(1)
        };
        let (game, _in_tx, mut out_rx, _store) = create_test_game(config, create_test_bank());

        let handle = game.start();
        let mut ticks = 0;
        while let Some(event) = out_rx.recv().await {
            match event {
                Event::TimeLeft(notice) => {
                    assert!(notice.time_left < Duration::from_secs(45));
                    ticks += 1;
                }
                Event::StateChange(sc) if sc.state == State::Finished => break,
                _ => {}
            }
        }
        handle.await.unwrap();

        // Ticks at 10, 20, 30 and 40 seconds in
        assert_eq!(ticks, 4);
    }
}

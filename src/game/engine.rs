use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use super::pool::{PoolError, QuestionPool};
use crate::bus::EventPublisher;
use crate::protocol::{GameEvent, PlayerAction, RoomName};
use crate::questions::PlayableQuestion;
use crate::store::{keys, SharedStore};

/// Wall-clock phases of one game. Production values come from configuration
/// (§"timers"); tests shrink them to milliseconds.
#[derive(Debug, Clone)]
pub struct GameTimers {
    /// Lobby hold after the game is announced.
    pub lobby: Duration,
    /// Time players get to answer each question.
    pub round: Duration,
    /// Pause between rounds.
    pub inter_round: Duration,
    /// Settle interval after admission closes, letting the last-admitted
    /// clients finish subscribing.
    pub settle: Duration,
}

impl Default for GameTimers {
    fn default() -> Self {
        Self {
            lobby: Duration::from_secs(10),
            round: Duration::from_secs(10),
            inter_round: Duration::from_secs(10),
            settle: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("shared store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// The per-game state machine. One instance runs per game, on the replica
/// that won the election; it owns the game's question pool and publishes
/// every phase event through the injected bus capability.
pub struct RoundEngine {
    room: RoomName,
    store: Arc<dyn SharedStore>,
    publisher: EventPublisher,
    timers: GameTimers,
    pool: QuestionPool,
    round: u32,
}

impl RoundEngine {
    #[must_use]
    pub fn new(
        room: RoomName,
        store: Arc<dyn SharedStore>,
        publisher: EventPublisher,
        timers: GameTimers,
        pool: QuestionPool,
    ) -> Self {
        Self {
            room,
            store,
            publisher,
            timers,
            pool,
            round: 0,
        }
    }

    /// Drive the game to completion. Never returns an error: a game failure
    /// is logged and ends this game only (other games and the bus are
    /// unaffected).
    pub async fn run(mut self) {
        self.publisher.publish(
            &self.room,
            GameEvent::NewGame {
                timer: self.timers.lobby.as_secs(),
            },
        );
        sleep(self.timers.lobby).await;

        // Close admission: the next cohort gets a fresh room and election.
        for key in [keys::NEXT_GAME_ROOM, keys::NEXT_GAME_SERVER] {
            if let Err(error) = self.store.del(key).await {
                tracing::error!(%error, key, room = %self.room, "failed to clear admission cell");
            }
        }
        sleep(self.timers.settle).await;

        loop {
            let survivors = match self.run_round().await {
                Ok(survivors) => survivors,
                Err(error) => {
                    tracing::error!(%error, room = %self.room, "game ended early");
                    break;
                }
            };
            if survivors <= 1 {
                break;
            }
            sleep(self.timers.inter_round).await;
        }

        if let Err(error) = self.store.del(self.room.as_str()).await {
            tracing::error!(%error, room = %self.room, "failed to delete roster");
        }
        tracing::info!(room = %self.room, rounds = self.round, "game over");
    }

    /// One question round: ask, wait, tally, broadcast the stats.
    /// Returns the number of survivors.
    async fn run_round(&mut self) -> Result<usize, EngineError> {
        self.round += 1;
        let question = self.pool.pop().await?;
        let round_answer_key = format!("{}-ROUND-{}-ANSWERS", self.room, self.round);
        let roster = self.store.smembers(self.room.as_str()).await?;

        self.publisher.publish(
            &self.room,
            GameEvent::NewRound {
                question: question.question.clone(),
                options: question.options.clone(),
                round_answer_key: round_answer_key.clone(),
                timer: self.timers.round.as_secs(),
                round: self.round,
                room: self.room.clone(),
            },
        );
        sleep(self.timers.round).await;

        let answers = self.store.hget_all(&round_answer_key).await?;
        let outcome = tally(&question, &roster, &answers);

        for username in &outcome.eliminated {
            self.eliminate(username).await;
        }
        self.publisher.publish(
            &self.room,
            GameEvent::RoundStats {
                round: self.round,
                options: question.options.clone(),
                stats: outcome.stats,
                correct_answer: question.answer.clone(),
                players_in_game: outcome.survivors,
            },
        );
        self.store.del(&round_answer_key).await?;

        tracing::info!(
            room = %self.room,
            round = self.round,
            survivors = outcome.survivors,
            "round tallied"
        );
        Ok(outcome.survivors)
    }

    /// Announce a departure and drop the player from the shared roster.
    async fn eliminate(&self, username: &str) {
        self.publisher.publish(
            &self.room,
            GameEvent::PlayersUpdate {
                action: PlayerAction::Left,
                username: username.to_owned(),
            },
        );
        if let Err(error) = self.store.srem(self.room.as_str(), username).await {
            tracing::error!(%error, room = %self.room, username, "failed to remove eliminated player");
        }
    }
}

/// What one round's answers add up to.
#[derive(Debug, PartialEq)]
struct TallyOutcome {
    survivors: usize,
    eliminated: Vec<String>,
    /// Per-option answer share; every option appears, 0.0 when unanswered.
    stats: HashMap<String, f64>,
}

/// Score one round. Every player in the roster snapshot counts exactly once
/// in the denominator: correct answers survive, anything else — a wrong
/// option, an answer outside the presented options, or silence — eliminates.
fn tally(
    question: &PlayableQuestion,
    roster: &HashSet<String>,
    answers: &HashMap<String, String>,
) -> TallyOutcome {
    let mut option_counts: HashMap<&str, usize> = question
        .options
        .iter()
        .map(|option| (option.as_str(), 0))
        .collect();
    let mut total_answers = 0usize;
    let mut survivors = 0usize;
    let mut eliminated = Vec::new();

    for (username, answer) in answers {
        total_answers += 1;
        match option_counts.get_mut(answer.as_str()) {
            Some(count) => {
                *count += 1;
                if *answer == question.answer {
                    survivors += 1;
                    continue;
                }
            }
            None => {
                tracing::error!(
                    username,
                    answer,
                    options = ?question.options,
                    "answer does not match any presented option"
                );
            }
        }
        eliminated.push(username.clone());
    }

    for username in roster {
        if !answers.contains_key(username) {
            total_answers += 1;
            eliminated.push(username.clone());
        }
    }

    let stats = option_counts
        .into_iter()
        .map(|(option, count)| {
            let share = if total_answers == 0 {
                0.0
            } else {
                count as f64 / total_answers as f64
            };
            (option.to_owned(), share)
        })
        .collect();

    TallyOutcome {
        survivors,
        eliminated,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> PlayableQuestion {
        PlayableQuestion {
            question: "Which planet is closest to the sun?".into(),
            answer: "Mercury".into(),
            options: vec!["Mercury".into(), "Venus".into(), "Mars".into()],
            source_index: 0,
        }
    }

    fn roster(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn answers(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(name, answer)| ((*name).to_string(), (*answer).to_string()))
            .collect()
    }

    #[test]
    fn test_tally_correct_answer_survives() {
        let outcome = tally(
            &question(),
            &roster(&["alice"]),
            &answers(&[("alice", "Mercury")]),
        );
        assert_eq!(outcome.survivors, 1);
        assert!(outcome.eliminated.is_empty());
        assert_eq!(outcome.stats["Mercury"], 1.0);
    }

    #[test]
    fn test_tally_wrong_and_silent_players_are_eliminated() {
        // Alice answers right, Bob wrong, Carol not at all.
        let outcome = tally(
            &question(),
            &roster(&["alice", "bob", "carol"]),
            &answers(&[("alice", "Mercury"), ("bob", "Venus")]),
        );
        assert_eq!(outcome.survivors, 1);
        let mut eliminated = outcome.eliminated.clone();
        eliminated.sort();
        assert_eq!(eliminated, vec!["bob", "carol"]);

        // All three roster players count in the denominator.
        assert!((outcome.stats["Mercury"] - 1.0 / 3.0).abs() < 1e-9);
        assert!((outcome.stats["Venus"] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(outcome.stats["Mars"], 0.0);
    }

    #[test]
    fn test_tally_answer_outside_options_is_eliminated() {
        let outcome = tally(
            &question(),
            &roster(&["mallory"]),
            &answers(&[("mallory", "Pluto")]),
        );
        assert_eq!(outcome.survivors, 0);
        assert_eq!(outcome.eliminated, vec!["mallory"]);
        // Still counted as an answer: the shares sum below 1.0 because the
        // submitted option is not on the board.
        assert_eq!(outcome.stats["Mercury"], 0.0);
    }

    #[test]
    fn test_tally_alternate_spelling_as_chosen_answer() {
        // When the pool picked an alternate spelling, that exact string is
        // both the answer and one of the options.
        let question = PlayableQuestion {
            question: "Fe is the symbol for <what>?".into(),
            answer: "Iron".into(),
            options: vec!["Iron".into(), "Gold".into(), "Lead".into()],
            source_index: 3,
        };
        let outcome = tally(
            &question,
            &roster(&["alice", "bob"]),
            &answers(&[("alice", "Iron"), ("bob", "iron")]),
        );
        // Case matters: "iron" is not among the presented options.
        assert_eq!(outcome.survivors, 1);
        assert_eq!(outcome.eliminated, vec!["bob"]);
    }

    #[test]
    fn test_tally_empty_round_has_zero_shares() {
        let outcome = tally(&question(), &roster(&[]), &HashMap::new());
        assert_eq!(outcome.survivors, 0);
        assert!(outcome.eliminated.is_empty());
        assert!(outcome.stats.values().all(|share| *share == 0.0));
    }
}

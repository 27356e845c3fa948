//! Game timers and question pool tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::{
    default_final_questions_per_refill, default_inter_round_pause_secs, default_lobby_timer_secs,
    default_min_queue_len, default_normal_questions_per_refill, default_refill_limit,
    default_round_timer_secs, default_settle_secs,
};
use crate::game::{GameTimers, PoolConfig, PoolSource};
use crate::store::keys;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seconds the lobby stays open after a game is announced.
    #[serde(default = "default_lobby_timer_secs")]
    pub lobby_timer_secs: u64,
    /// Seconds players get to answer each question.
    #[serde(default = "default_round_timer_secs")]
    pub round_timer_secs: u64,
    /// Seconds between rounds.
    #[serde(default = "default_inter_round_pause_secs")]
    pub inter_round_pause_secs: u64,
    /// Seconds after admission closes before the first round, letting the
    /// last-admitted clients become subscribed.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// Regular-difficulty questions drawn per pool refill.
    #[serde(default = "default_normal_questions_per_refill")]
    pub normal_questions_per_refill: usize,
    /// Final-round questions drawn per pool refill.
    #[serde(default = "default_final_questions_per_refill")]
    pub final_questions_per_refill: usize,
    /// The pool refills when it drops below this many queued questions.
    #[serde(default = "default_min_queue_len")]
    pub min_queue_len: usize,
    /// Maximum pool refills per game.
    #[serde(default = "default_refill_limit")]
    pub refill_limit: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            lobby_timer_secs: default_lobby_timer_secs(),
            round_timer_secs: default_round_timer_secs(),
            inter_round_pause_secs: default_inter_round_pause_secs(),
            settle_secs: default_settle_secs(),
            normal_questions_per_refill: default_normal_questions_per_refill(),
            final_questions_per_refill: default_final_questions_per_refill(),
            min_queue_len: default_min_queue_len(),
            refill_limit: default_refill_limit(),
        }
    }
}

impl GameConfig {
    #[must_use]
    pub fn timers(&self) -> GameTimers {
        GameTimers {
            lobby: Duration::from_secs(self.lobby_timer_secs),
            round: Duration::from_secs(self.round_timer_secs),
            inter_round: Duration::from_secs(self.inter_round_pause_secs),
            settle: Duration::from_secs(self.settle_secs),
        }
    }

    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            sources: vec![
                PoolSource {
                    hash_key: keys::NORMAL_QUESTIONS.to_owned(),
                    draw: self.normal_questions_per_refill,
                },
                PoolSource {
                    hash_key: keys::FINAL_QUESTIONS.to_owned(),
                    draw: self.final_questions_per_refill,
                },
            ],
            min_queue_len: self.min_queue_len,
            refill_limit: self.refill_limit,
        }
    }
}

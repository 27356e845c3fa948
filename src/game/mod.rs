//! The per-game machinery: the round engine state machine and the question
//! pool it draws from, plus the launcher that ties both to the lobby.

pub mod engine;
pub mod pool;

pub use engine::{GameTimers, RoundEngine};
pub use pool::{PoolConfig, PoolError, PoolSource, QuestionPool};

use std::sync::Arc;

use crate::bus::EventPublisher;
use crate::lobby::GameLauncher;
use crate::protocol::RoomName;
use crate::store::SharedStore;

/// Production [`GameLauncher`]: builds a round engine with a fresh question
/// pool and runs it on this replica as a detached task.
pub struct EngineLauncher {
    store: Arc<dyn SharedStore>,
    publisher: EventPublisher,
    timers: GameTimers,
    pool_config: PoolConfig,
}

impl EngineLauncher {
    #[must_use]
    pub fn new(
        store: Arc<dyn SharedStore>,
        publisher: EventPublisher,
        timers: GameTimers,
        pool_config: PoolConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            timers,
            pool_config,
        }
    }
}

impl GameLauncher for EngineLauncher {
    fn launch(&self, room: RoomName) {
        let pool = QuestionPool::new(Arc::clone(&self.store), self.pool_config.clone());
        let engine = RoundEngine::new(
            room.clone(),
            Arc::clone(&self.store),
            self.publisher.clone(),
            self.timers.clone(),
            pool,
        );
        tracing::info!(room = %room, "starting game");
        tokio::spawn(engine.run());
    }
}

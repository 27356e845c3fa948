use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::protocol::{room_codes, GameEvent, RoomName};
use crate::store::{keys, SharedStore};

/// Starts a game for a room. The production implementation spawns a round
/// engine on this replica; tests inject a recorder.
pub trait GameLauncher: Send + Sync {
    fn launch(&self, room: RoomName);
}

/// Outcome of one admission attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub username: String,
    /// `None` when admission was denied.
    pub room_name: Option<RoomName>,
    /// Roster snapshot taken before this player was added.
    pub other_players: BTreeSet<String>,
    pub min_players: usize,
    /// Whether a replica has claimed the next game by the time this
    /// admission completed.
    pub game_starting: bool,
    /// Denial payload, present only when `room_name` is `None`.
    pub denial: Option<GameEvent>,
}

/// Admission control and game election, shared across replicas through the
/// store: the next-room pointer tells every replica where joiners go, and
/// the next-game-server cell elects which replica runs the game.
pub struct LobbyCoordinator {
    instance_name: String,
    store: Arc<dyn SharedStore>,
    min_players: usize,
    launcher: Arc<dyn GameLauncher>,
}

impl LobbyCoordinator {
    #[must_use]
    pub fn new(
        instance_name: impl Into<String>,
        store: Arc<dyn SharedStore>,
        min_players: usize,
        launcher: Arc<dyn GameLauncher>,
    ) -> Self {
        Self {
            instance_name: instance_name.into(),
            store,
            min_players,
            launcher,
        }
    }

    #[must_use]
    pub fn min_players(&self) -> usize {
        self.min_players
    }

    /// Admit `username` into the next game room.
    ///
    /// When this admission brings the roster to the threshold and no replica
    /// has claimed the game yet, claims it with a set-if-absent write and
    /// launches the round engine here. The roster-size read is advisory: a
    /// concurrent admission can make the starting cohort one player larger
    /// than the threshold, which is accepted.
    pub async fn register_player(&self, username: &str) -> Result<Registration> {
        let room = self.next_game_room().await?;

        if self.store.sismember(room.as_str(), username).await? {
            return Ok(Registration {
                username: username.to_owned(),
                room_name: None,
                other_players: BTreeSet::new(),
                min_players: self.min_players,
                game_starting: false,
                denial: Some(GameEvent::Info {
                    msg: "This username already exists, please pick a different one".to_owned(),
                }),
            });
        }

        let roster_len = self.store.scard(room.as_str()).await?;
        if self.min_players.saturating_sub(roster_len) <= 1
            && self
                .store
                .set_if_absent(keys::NEXT_GAME_SERVER, &self.instance_name)
                .await?
        {
            tracing::info!(
                room = %room,
                instance = %self.instance_name,
                "claimed the next game, launching round engine"
            );
            self.launcher.launch(room.clone());
        }

        let other_players: BTreeSet<String> = self
            .store
            .smembers(room.as_str())
            .await?
            .into_iter()
            .collect();
        self.store.sadd(room.as_str(), username).await?;
        let game_starting = self.store.get(keys::NEXT_GAME_SERVER).await?.is_some();

        tracing::debug!(room = %room, username, game_starting, "player admitted");
        Ok(Registration {
            username: username.to_owned(),
            room_name: Some(room),
            other_players,
            min_players: self.min_players,
            game_starting,
            denial: None,
        })
    }

    /// Resolve the room the next game will be played in, minting one if no
    /// replica has published a pointer yet. Losing the publish race means
    /// adopting the winner's room.
    async fn next_game_room(&self) -> Result<RoomName> {
        for _ in 0..4 {
            if let Some(existing) = self.store.get(keys::NEXT_GAME_ROOM).await? {
                return Ok(RoomName::from(existing));
            }
            let minted = room_codes::generate_room_name();
            if self
                .store
                .set_if_absent(keys::NEXT_GAME_ROOM, minted.as_str())
                .await?
            {
                tracing::info!(room = %minted, "opened a new lobby room");
                return Ok(minted);
            }
            // Lost the race; loop to read the winner. A concurrent game
            // start can delete the pointer between the two calls, hence
            // the bounded retry.
        }
        bail!("could not resolve the next game room");
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::RoomName;

/// Whether a `players_update` announces an arrival or a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Joined,
    Left,
}

/// A game event broadcast on the shared channel.
///
/// `#[serde(tag = "type")]` produces the internally tagged JSON the web
/// client consumes: `{ "type": "new_game", "timer": 10 }`. The variants are
/// the complete vocabulary of the bus; anything else on the channel is
/// protocol drift and gets dropped by the listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A game was created; the lobby closes after `timer` seconds.
    NewGame { timer: u64 },
    /// A round started. Answers go into the hash keyed by `round_answer_key`.
    NewRound {
        question: String,
        options: Vec<String>,
        round_answer_key: String,
        timer: u64,
        round: u32,
        room: RoomName,
    },
    /// End-of-round tally: per-option answer shares and the survivor count.
    RoundStats {
        round: u32,
        options: Vec<String>,
        stats: HashMap<String, f64>,
        correct_answer: String,
        players_in_game: usize,
    },
    /// A player joined or left the room.
    PlayersUpdate {
        action: PlayerAction,
        username: String,
    },
    /// Informational notice, e.g. an admission denial.
    Info { msg: String },
    /// Client-input problem, e.g. a missing username.
    Warning { msg: String },
}

/// The envelope actually published on the channel: the event plus the room
/// it is addressed to. The listener strips `room_name` before delivering to
/// clients, so clients only ever see the flattened [`GameEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub room_name: RoomName,
    #[serde(flatten)]
    pub event: GameEvent,
}

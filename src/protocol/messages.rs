use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::events::GameEvent;
use super::types::RoomName;

/// Commands a client sends over its WebSocket.
///
/// Tagged by `event` so a frame reads
/// `{ "event": "register_client", "username": "alice" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Ask to be admitted into the next game room.
    ///
    /// `username` stays optional at the parse layer so a missing field is
    /// answered with a `warning` payload instead of a silent decode error.
    RegisterClient {
        #[serde(default)]
        username: Option<String>,
    },
    /// Submit an answer for the current round. No reply is sent.
    ReportRoundAnswer {
        round_answer_key: String,
        username: String,
        answer: String,
    },
}

/// Reply to `register_client`.
///
/// `room_name` serializes as the room string on success and as literal
/// `false` on denial, which is what the web client switches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterReply {
    pub username: String,
    #[serde(with = "room_or_false")]
    pub room_name: Option<RoomName>,
    pub other_players: BTreeSet<String>,
    pub min_players: usize,
    pub game_starting: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<GameEvent>,
}

impl RegisterReply {
    /// A denial reply carrying only the message payload.
    #[must_use]
    pub fn denied(username: impl Into<String>, min_players: usize, msg: GameEvent) -> Self {
        Self {
            username: username.into(),
            room_name: None,
            other_players: BTreeSet::new(),
            min_players,
            game_starting: false,
            msg: Some(msg),
        }
    }
}

/// Serializes `Option<RoomName>` as the plain room string or JSON `false`.
mod room_or_false {
    use super::RoomName;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(room: &Option<RoomName>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match room {
            Some(name) => name.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<RoomName>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(name) => Ok(Some(RoomName::from(name))),
            serde_json::Value::Bool(false) => Ok(None),
            other => Err(D::Error::custom(format!(
                "expected a room name string or false, got {other}"
            ))),
        }
    }
}

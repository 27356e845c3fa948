use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque per-replica session identifier for a connected client.
pub type SessionId = Uuid;

/// Name of a game room, e.g. `room-0042-abcd-wxyz`.
///
/// The same string keys the roster set in the shared store, so the newtype
/// keeps room names from being mixed up with usernames or store keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name_serializes_as_plain_string() {
        let room = RoomName::from("room-0001-abcd-efgh");
        let json = serde_json::to_string(&room).unwrap();
        assert_eq!(json, "\"room-0001-abcd-efgh\"");
    }

    #[test]
    fn test_room_name_round_trip() {
        let room: RoomName = serde_json::from_str("\"room-0002-aaaa-bbbb\"").unwrap();
        assert_eq!(room.as_str(), "room-0002-aaaa-bbbb");
    }
}

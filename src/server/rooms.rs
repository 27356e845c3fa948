use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::bus::RoomBroadcaster;
use crate::protocol::{RoomName, SessionId};

/// Outbound frame queue for one connected session.
pub type SessionSender = mpsc::UnboundedSender<String>;

/// Per-replica room membership: which locally-connected sessions are joined
/// to which room. This is the transport's view only; the authoritative
/// roster lives in the shared store.
pub struct LocalRooms {
    rooms: DashMap<String, HashMap<SessionId, SessionSender>>,
}

impl LocalRooms {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Join a session to a room.
    pub fn join(&self, room: &RoomName, session: SessionId, sender: SessionSender) {
        self.rooms
            .entry(room.as_str().to_owned())
            .or_default()
            .insert(session, sender);
    }

    /// Remove a session from a room, dropping the room once empty.
    pub fn leave(&self, room: &RoomName, session: SessionId) {
        let mut empty = false;
        if let Some(mut members) = self.rooms.get_mut(room.as_str()) {
            members.remove(&session);
            empty = members.is_empty();
        }
        if empty {
            self.rooms
                .remove_if(room.as_str(), |_, members| members.is_empty());
        }
    }

    /// Number of sessions locally joined to a room.
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    /// Send an already-serialized frame to every session in a room.
    /// Sessions whose outbound queue is gone are skipped; their connection
    /// task cleans them up on disconnect.
    pub fn send_to_room(&self, room: &str, frame: &str) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for sender in members.values() {
            let _ = sender.send(frame.to_owned());
        }
    }
}

impl Default for LocalRooms {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomBroadcaster for LocalRooms {
    fn deliver(&self, room: &str, payload: serde_json::Value) {
        match serde_json::to_string(&payload) {
            Ok(frame) => self.send_to_room(room, &frame),
            Err(error) => {
                tracing::error!(%error, room, "failed to serialize broadcast for delivery");
            }
        }
    }
}

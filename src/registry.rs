use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bus::EventPublisher;
use crate::protocol::{GameEvent, PlayerAction, RoomName, SessionId};
use crate::store::SharedStore;

/// What the replica remembers about one connected session.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub username: String,
    pub room_name: RoomName,
    pub connected_at: DateTime<Utc>,
}

/// Process-local registry of connected sessions.
///
/// `admit` and `forget` mutate the local map and enqueue the corresponding
/// `players_update` broadcast; neither waits on bus delivery. `forget` also
/// clears the username from the room roster in the shared store so a
/// mid-game disconnect reads as an elimination.
pub struct UserRegistry {
    sessions: Mutex<HashMap<SessionId, UserInfo>>,
    store: Arc<dyn SharedStore>,
    publisher: EventPublisher,
}

impl UserRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, publisher: EventPublisher) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
            publisher,
        }
    }

    /// Record an admitted session and announce the join.
    pub async fn admit(&self, session: SessionId, username: &str, room: &RoomName) {
        let info = UserInfo {
            username: username.to_owned(),
            room_name: room.clone(),
            connected_at: Utc::now(),
        };
        self.sessions.lock().await.insert(session, info);
        self.publisher.publish(
            room,
            GameEvent::PlayersUpdate {
                action: PlayerAction::Joined,
                username: username.to_owned(),
            },
        );
    }

    /// Drop a session on disconnect. Announces the departure and removes the
    /// username from the shared roster if still present. Returns what was
    /// registered, or `None` for sessions that never completed admission.
    pub async fn forget(&self, session: SessionId) -> Option<UserInfo> {
        let info = self.sessions.lock().await.remove(&session)?;

        self.publisher.publish(
            &info.room_name,
            GameEvent::PlayersUpdate {
                action: PlayerAction::Left,
                username: info.username.clone(),
            },
        );

        let store = Arc::clone(&self.store);
        let room = info.room_name.clone();
        let username = info.username.clone();
        tokio::spawn(async move {
            match store.sismember(room.as_str(), &username).await {
                Ok(true) => {
                    if let Err(error) = store.srem(room.as_str(), &username).await {
                        tracing::error!(%error, room = %room, username, "failed to clear roster entry");
                    }
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::error!(%error, room = %room, username, "failed to read roster");
                }
            }
        });

        Some(info)
    }

    /// Whether a session is currently registered.
    pub async fn contains(&self, session: SessionId) -> bool {
        self.sessions.lock().await.contains_key(&session)
    }

    /// Number of registered sessions on this replica.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

use anyhow::Result;
use std::sync::Arc;

use crate::protocol::{Envelope, GameEvent, RoomName};
use crate::store::SharedStore;

/// Delivery side of the bus: hands a payload to every client locally joined
/// to a room. Implemented by the transport layer; the listener never learns
/// anything else about connections.
pub trait RoomBroadcaster: Send + Sync {
    fn deliver(&self, room: &str, payload: serde_json::Value);
}

/// Publishing capability handed to the round engine and the user registry.
///
/// Publishes are fire-and-forget: the payload is serialized and pushed onto
/// the shared channel from a spawned task, so callers never wait on bus
/// delivery. Failures are logged inside the task.
#[derive(Clone)]
pub struct EventPublisher {
    store: Arc<dyn SharedStore>,
    channel: String,
}

impl EventPublisher {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, channel: impl Into<String>) -> Self {
        Self {
            store,
            channel: channel.into(),
        }
    }

    /// Publish `event` addressed to `room` on the shared channel.
    pub fn publish(&self, room: &RoomName, event: GameEvent) {
        let envelope = Envelope {
            room_name: room.clone(),
            event,
        };
        let store = Arc::clone(&self.store);
        let channel = self.channel.clone();
        tokio::spawn(async move {
            let payload = match serde_json::to_string(&envelope) {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::error!(%error, "failed to serialize bus envelope");
                    return;
                }
            };
            if let Err(error) = store.publish(&channel, &payload).await {
                tracing::error!(%error, channel, "failed to publish bus envelope");
            }
        });
    }
}

/// Per-replica bus subscriber.
///
/// Holds the single subscription on the shared channel and demultiplexes
/// each broadcast to the locally-joined clients of the named room. Message
/// order on the subscription is the channel's native order; deliveries are
/// spawned per message and may interleave.
pub struct BusListener {
    store: Arc<dyn SharedStore>,
    channel: String,
    rooms: Arc<dyn RoomBroadcaster>,
}

impl BusListener {
    #[must_use]
    pub fn new(
        store: Arc<dyn SharedStore>,
        channel: impl Into<String>,
        rooms: Arc<dyn RoomBroadcaster>,
    ) -> Self {
        Self {
            store,
            channel: channel.into(),
            rooms,
        }
    }

    /// Subscribe and pump messages until the subscription closes.
    pub async fn run(self) -> Result<()> {
        let mut messages = self.store.subscribe(&self.channel).await?;
        tracing::info!(channel = %self.channel, "bus listener subscribed");
        while let Some(raw) = messages.recv().await {
            self.dispatch(raw);
        }
        tracing::warn!(channel = %self.channel, "bus subscription closed");
        Ok(())
    }

    /// Validate one bus payload and fan it out to the addressed room.
    fn dispatch(&self, raw: String) {
        let mut payload: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                tracing::error!(%error, payload = %raw, "dropping bus message that is not valid JSON");
                return;
            }
        };

        let room = {
            let Some(object) = payload.as_object_mut() else {
                tracing::warn!(payload = %raw, "dropping non-object bus message");
                return;
            };
            if !object.contains_key("type") {
                tracing::warn!(payload = %raw, "dropping bus message without a type");
                return;
            }
            // Consumed here; clients never see the routing field.
            match object.remove("room_name") {
                Some(serde_json::Value::String(room)) => room,
                _ => {
                    tracing::warn!(payload = %raw, "dropping bus message without a room_name");
                    return;
                }
            }
        };

        let rooms = Arc::clone(&self.rooms);
        tokio::spawn(async move {
            rooms.deliver(&room, payload);
        });
    }
}

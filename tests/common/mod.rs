//! Shared helpers for the integration suites.

#![allow(dead_code)]

use quiz_royale_server::game::GameTimers;
use quiz_royale_server::lobby::GameLauncher;
use quiz_royale_server::protocol::RoomName;
use quiz_royale_server::questions::QuestionRecord;
use quiz_royale_server::store::{MemoryStore, SharedStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Millisecond-scale timers so a whole game fits in a test.
pub fn fast_timers() -> GameTimers {
    GameTimers {
        lobby: Duration::from_millis(50),
        round: Duration::from_millis(200),
        inter_round: Duration::from_millis(20),
        settle: Duration::from_millis(10),
    }
}

/// Seed `count` catalog records whose correct answer is always `"Right"`,
/// so tests can submit answers without peeking at the engine's pick.
pub async fn seed_fixed_catalog(store: &dyn SharedStore, hash_key: &str, count: usize) {
    for index in 0..count {
        let record = QuestionRecord {
            category: "test".into(),
            question: format!("question {index}"),
            answer: "Right".into(),
            alternate_spellings: Vec::new(),
            suggestions: vec!["Wrong A".into(), "Wrong B".into()],
        };
        store
            .hset(
                hash_key,
                &index.to_string(),
                &serde_json::to_string(&record).unwrap(),
            )
            .await
            .unwrap();
    }
}

/// Records launched rooms instead of running games.
#[derive(Default)]
pub struct RecordingLauncher {
    pub launched: Mutex<Vec<RoomName>>,
}

impl RecordingLauncher {
    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }
}

impl GameLauncher for RecordingLauncher {
    fn launch(&self, room: RoomName) {
        self.launched.lock().unwrap().push(room);
    }
}

/// Read bus messages until one with the given `type` arrives, returning the
/// decoded envelope. Panics after two seconds; intermediate events of other
/// types are pushed into `seen`.
pub async fn await_event_of_type(
    bus: &mut mpsc::Receiver<String>,
    event_type: &str,
    seen: &mut Vec<serde_json::Value>,
) -> serde_json::Value {
    let deadline = Duration::from_secs(2);
    loop {
        let raw = tokio::time::timeout(deadline, bus.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {event_type}"))
            .expect("bus closed");
        let payload: serde_json::Value = serde_json::from_str(&raw).unwrap();
        if payload["type"] == event_type {
            return payload;
        }
        seen.push(payload);
    }
}

/// A fresh in-memory store, as both the concrete and trait-object handle.
pub fn memory_store() -> (Arc<MemoryStore>, Arc<dyn SharedStore>) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn SharedStore> = Arc::clone(&store) as _;
    (store, shared)
}

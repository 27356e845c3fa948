use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Well-known keys shared between replicas.
pub mod keys {
    /// String cell naming the room the next game will be played in.
    pub const NEXT_GAME_ROOM: &str = "next_game_room";
    /// String cell naming the replica elected to run the next game.
    pub const NEXT_GAME_SERVER: &str = "next_game_server";
    /// Hash of regular-difficulty question records, field = index.
    pub const NORMAL_QUESTIONS: &str = "questions_normal";
    /// Hash of final-round question records, field = index.
    pub const FINAL_QUESTIONS: &str = "questions_final";
    /// Default pub/sub channel all game traffic is broadcast on.
    pub const BROADCAST_CHANNEL: &str = "hq_trivia";
}

/// The capability surface every replica needs from the shared store: string
/// cells with set-if-absent, sets for room rosters, hashes for questions and
/// round answers, and pub/sub for the broadcast bus.
///
/// `set_if_absent` is the only cross-replica compare-and-set the system
/// relies on; everything else tolerates races by construction.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Write a string cell only if the key does not exist. Returns whether
    /// this call created the cell.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool>;

    /// Read a string cell.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key of any kind. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Add a member to a set. Returns whether the member was newly added.
    async fn sadd(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove a member from a set. Returns whether the member was present.
    async fn srem(&self, key: &str, member: &str) -> Result<bool>;

    /// Test set membership.
    async fn sismember(&self, key: &str, member: &str) -> Result<bool>;

    /// Set cardinality. A missing set has cardinality 0.
    async fn scard(&self, key: &str) -> Result<usize>;

    /// All members of a set.
    async fn smembers(&self, key: &str) -> Result<HashSet<String>>;

    /// Set one field of a hash, creating the hash if needed.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Read a whole hash. A missing hash reads as empty.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Read several hash fields in one round-trip; missing fields yield
    /// `None` in the corresponding slot.
    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>>;

    /// Number of fields in a hash. A missing hash has length 0.
    async fn hlen(&self, key: &str) -> Result<usize>;

    /// Publish a payload on a channel.
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;

    /// Subscribe to a channel. Messages published after this call resolves
    /// arrive on the returned receiver in publication order.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>>;
}

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, mpsc, RwLock};

use super::SharedStore;

/// Capacity of the per-channel broadcast ring. Subscribers that fall this
/// far behind lose messages, which only matters under test-scale load.
const CHANNEL_CAPACITY: usize = 256;

/// In-memory shared store for tests and single-replica development.
///
/// Every multi-step operation takes its write lock once, so there is no
/// TOCTOU gap between check and insert — `set_if_absent` in particular is
/// atomic with respect to concurrent callers.
pub struct MemoryStore {
    cells: RwLock<HashMap<String, String>>,
    sets: RwLock<HashMap<String, HashSet<String>>>,
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            sets: RwLock::new(HashMap::new()),
            hashes: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
        }
    }

    async fn channel_sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut cells = self.cells.write().await;
        if cells.contains_key(key) {
            return Ok(false);
        }
        cells.insert(key.to_owned(), value.to_owned());
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cells.read().await.get(key).cloned())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.cells.write().await.remove(key);
        self.sets.write().await.remove(key);
        self.hashes.write().await.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let mut sets = self.sets.write().await;
        Ok(sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let mut sets = self.sets.write().await;
        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(removed)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self
            .sets
            .read()
            .await
            .get(key)
            .is_some_and(|set| set.contains(member)))
    }

    async fn scard(&self, key: &str) -> Result<usize> {
        Ok(self.sets.read().await.get(key).map_or(0, HashSet::len))
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self.sets.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut hashes = self.hashes.write().await;
        hashes
            .entry(key.to_owned())
            .or_default()
            .insert(field.to_owned(), value.to_owned());
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        let hashes = self.hashes.read().await;
        let hash = hashes.get(key);
        Ok(fields
            .iter()
            .map(|field| hash.and_then(|h| h.get(field).cloned()))
            .collect())
    }

    async fn hlen(&self, key: &str) -> Result<usize> {
        Ok(self.hashes.read().await.get(key).map_or(0, HashMap::len))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        // A send error only means nobody is subscribed yet; Redis drops
        // such messages too.
        let _ = self.channel_sender(channel).await.send(payload.to_owned());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>> {
        let mut source = self.channel_sender(channel).await.subscribe();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "in-memory subscriber lagged; messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}

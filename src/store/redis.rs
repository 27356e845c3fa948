use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;

use super::SharedStore;

/// Buffer between the pub/sub reader task and the listener.
const SUBSCRIPTION_BUFFER: usize = 256;

/// Production shared store backed by Redis.
///
/// Commands go through a [`ConnectionManager`], which multiplexes and
/// reconnects on its own. Each subscription gets a dedicated pub/sub
/// connection owned by a reader task, because a connection in subscriber
/// mode cannot issue regular commands.
pub struct RedisStore {
    client: Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the store at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).with_context(|| format!("invalid redis url {url}"))?;
        let conn = client
            .get_connection_manager()
            .await
            .with_context(|| format!("failed to connect to redis at {url}"))?;
        Ok(Self { client, conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.conn();
        // SET NX replies OK when the key was created and nil otherwise.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .with_context(|| format!("SET NX {key}"))?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn()
            .get(key)
            .await
            .with_context(|| format!("GET {key}"))?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.conn()
            .del::<_, ()>(key)
            .await
            .with_context(|| format!("DEL {key}"))?;
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let added: i64 = self
            .conn()
            .sadd(key, member)
            .await
            .with_context(|| format!("SADD {key}"))?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let removed: i64 = self
            .conn()
            .srem(key, member)
            .await
            .with_context(|| format!("SREM {key}"))?;
        Ok(removed > 0)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let member_of: bool = self
            .conn()
            .sismember(key, member)
            .await
            .with_context(|| format!("SISMEMBER {key}"))?;
        Ok(member_of)
    }

    async fn scard(&self, key: &str) -> Result<usize> {
        let cardinality: usize = self
            .conn()
            .scard(key)
            .await
            .with_context(|| format!("SCARD {key}"))?;
        Ok(cardinality)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        let members: Vec<String> = self
            .conn()
            .smembers(key)
            .await
            .with_context(|| format!("SMEMBERS {key}"))?;
        Ok(members.into_iter().collect())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.conn()
            .hset::<_, _, _, ()>(key, field, value)
            .await
            .with_context(|| format!("HSET {key} {field}"))?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let entries: HashMap<String, String> = self
            .conn()
            .hgetall(key)
            .await
            .with_context(|| format!("HGETALL {key}"))?;
        Ok(entries)
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn();
        let slots: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await
            .with_context(|| format!("HMGET {key}"))?;
        Ok(slots)
    }

    async fn hlen(&self, key: &str) -> Result<usize> {
        let length: usize = self
            .conn()
            .hlen(key)
            .await
            .with_context(|| format!("HLEN {key}"))?;
        Ok(length)
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        self.conn()
            .publish::<_, _, ()>(channel, payload)
            .await
            .with_context(|| format!("PUBLISH {channel}"))?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .context("failed to open pub/sub connection")?;
        pubsub
            .subscribe(channel)
            .await
            .with_context(|| format!("SUBSCRIBE {channel}"))?;

        let channel = channel.to_owned();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            let mut messages = pubsub.on_message();
            while let Some(message) = messages.next().await {
                match message.get_payload::<String>() {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            // Receiver dropped; tear the subscription down.
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, channel, "non-UTF-8 payload on bus channel");
                    }
                }
            }
            tracing::info!(channel, "pub/sub reader stopped");
        });
        Ok(rx)
    }
}

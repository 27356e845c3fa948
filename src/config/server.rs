//! Replica behavior configuration.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_channel, default_cors_origins, default_min_players, default_questions_file,
    default_redis_url, default_static_dir,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Shared store connection, e.g. `redis://127.0.0.1:6379`.
    /// The bare `REDIS_URL` environment variable also overrides this.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Pub/sub channel all game traffic is broadcast on.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Admission threshold: a game starts once this many players joined.
    /// The bare `MIN_PLAYERS` environment variable also overrides this.
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    /// Clear the next-room and next-game-server cells at startup.
    /// Convenient for single-replica development; leave off in a
    /// multi-replica deployment, where it would disrupt an ongoing
    /// election by another replica.
    #[serde(default)]
    pub single_replica: bool,
    /// Directory the static web client is served from.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Question catalog file loaded into the store at startup.
    #[serde(default = "default_questions_file")]
    pub questions_file: String,
    /// Comma-separated CORS origins, or `*` for permissive.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            channel: default_channel(),
            min_players: default_min_players(),
            single_replica: false,
            static_dir: default_static_dir(),
            questions_file: default_questions_file(),
            cors_origins: default_cors_origins(),
        }
    }
}

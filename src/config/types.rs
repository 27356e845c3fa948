//! Root configuration type.

use serde::{Deserialize, Serialize};

use super::defaults::default_port;
use super::game::GameConfig;
use super::logging::LoggingConfig;
use super::server::ServerConfig;

/// Root configuration for one replica.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// TCP port the HTTP/WebSocket listener binds.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            game: GameConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

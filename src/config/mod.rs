//! Configuration module.
//!
//! Supports JSON configuration files, environment variable overrides and
//! compiled-in defaults.
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`server`]: Replica behavior (store connection, admission, transport)
//! - [`game`]: Game timers and question pool tuning
//! - [`logging`]: Logging configuration
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod game;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;

pub use game::GameConfig;
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use types::Config;
pub use validation::{validate_config, ConfigError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.server.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.server.channel, "hq_trivia");
        assert_eq!(config.server.min_players, 3);
        assert!(!config.server.single_replica);

        assert_eq!(config.game.lobby_timer_secs, 10);
        assert_eq!(config.game.round_timer_secs, 10);
        assert_eq!(config.game.inter_round_pause_secs, 10);
        assert_eq!(config.game.settle_secs, 2);
        assert_eq!(config.game.normal_questions_per_refill, 10);
        assert_eq!(config.game.final_questions_per_refill, 5);
        assert_eq!(config.game.min_queue_len, 5);
        assert_eq!(config.game.refill_limit, 10);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(config.server.min_players, deserialized.server.min_players);
        assert_eq!(
            config.game.round_timer_secs,
            deserialized.game.round_timer_secs
        );
    }

    #[test]
    fn test_default_config_passes_validation() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}

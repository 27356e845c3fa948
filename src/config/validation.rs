//! Configuration validation functions.

use thiserror::Error;
use url::Url;

use super::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("server.redis_url is not a valid URL: {0}")]
    InvalidRedisUrl(String),
    #[error("server.redis_url must use the redis://, rediss:// or unix:// scheme, got {0}")]
    UnsupportedScheme(String),
    #[error("server.min_players must be at least 2, got {0}")]
    MinPlayersTooLow(usize),
    #[error("game.{name} must be at least 1 second")]
    TimerTooShort { name: &'static str },
    #[error("game.min_queue_len must be at least 1")]
    QueueLenTooLow,
    #[error("game.refill_limit must be at least 1")]
    RefillLimitTooLow,
}

/// Reject configurations the server cannot run with. Called once at
/// startup; `--validate-config` surfaces the same result for CI.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = Url::parse(&config.server.redis_url)
        .map_err(|e| ConfigError::InvalidRedisUrl(e.to_string()))?;
    if !matches!(url.scheme(), "redis" | "rediss" | "unix") {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
    }

    if config.server.min_players < 2 {
        return Err(ConfigError::MinPlayersTooLow(config.server.min_players));
    }

    for (name, value) in [
        ("lobby_timer_secs", config.game.lobby_timer_secs),
        ("round_timer_secs", config.game.round_timer_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::TimerTooShort { name });
        }
    }

    if config.game.min_queue_len == 0 {
        return Err(ConfigError::QueueLenTooLow);
    }
    if config.game.refill_limit == 0 {
        return Err(ConfigError::RefillLimitTooLow);
    }

    Ok(())
}

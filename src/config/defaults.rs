//! Default value functions referenced from the serde derives.

use super::logging::LogFormat;

pub fn default_port() -> u16 {
    8080
}

pub fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

pub fn default_channel() -> String {
    crate::store::keys::BROADCAST_CHANNEL.to_string()
}

pub fn default_min_players() -> usize {
    3
}

pub fn default_static_dir() -> String {
    "static".to_string()
}

pub fn default_questions_file() -> String {
    "questions/questions.json".to_string()
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub fn default_lobby_timer_secs() -> u64 {
    10
}

pub fn default_round_timer_secs() -> u64 {
    10
}

pub fn default_inter_round_pause_secs() -> u64 {
    10
}

pub fn default_settle_secs() -> u64 {
    2
}

pub fn default_normal_questions_per_refill() -> usize {
    10
}

pub fn default_final_questions_per_refill() -> usize {
    5
}

pub fn default_min_queue_len() -> usize {
    5
}

pub fn default_refill_limit() -> u32 {
    10
}

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub fn default_enable_file_logging() -> bool {
    false
}

pub fn default_log_format() -> LogFormat {
    LogFormat::Text
}

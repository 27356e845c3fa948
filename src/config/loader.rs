//! Configuration loading and environment parsing.

use serde_json::Value;
use std::path::Path;

use super::Config;

/// Load configuration with the following precedence (highest first):
/// 1) `QUIZ_ROYALE_CONFIG_JSON` env var containing raw JSON
/// 2) File pointed at by `QUIZ_ROYALE_CONFIG_PATH`
/// 3) `config.json` in the current working directory
/// 4) Defaults compiled into the binary
///
/// Individual fields can then be overridden by environment variables with
/// the `QUIZ_ROYALE` prefix and `__` as a nested separator, e.g.
/// `QUIZ_ROYALE__PORT=9000` or `QUIZ_ROYALE__SERVER__MIN_PLAYERS=2`.
/// The bare `REDIS_URL` and `MIN_PLAYERS` variables are honored too, since
/// deployment platforms conventionally inject the former.
///
/// Errors while reading or parsing any source are printed to stderr and the
/// remaining sources apply; `load()` always returns a `Config`. Callers who
/// need hard failure run [`super::validate_config`] on the result.
#[must_use]
pub fn load() -> Config {
    use std::env;
    use std::path::PathBuf;

    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    // 1) Inline JSON via env var
    if let Ok(json) = env::var("QUIZ_ROYALE_CONFIG_JSON") {
        if let Some(patch) = parse_json(&json, "QUIZ_ROYALE_CONFIG_JSON") {
            overlay(&mut merged, patch);
        }
    }

    // 2) Explicit path via env var
    if let Ok(path) = env::var("QUIZ_ROYALE_CONFIG_PATH") {
        merge_json_file(&mut merged, &PathBuf::from(path));
    }

    // 3) config.json in CWD
    merge_json_file(&mut merged, &PathBuf::from("config.json"));

    // Environment overrides with prefix QUIZ_ROYALE and nested separator __
    apply_env_overrides(&mut merged);

    // Conventional bare variables
    if let Ok(redis_url) = env::var("REDIS_URL") {
        set_path(
            &mut merged,
            &["server".to_string(), "redis_url".to_string()],
            Value::String(redis_url),
        );
    }
    if let Ok(min_players) = env::var("MIN_PLAYERS") {
        set_path(
            &mut merged,
            &["server".to_string(), "min_players".to_string()],
            env_value(&min_players),
        );
    }

    match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Merged configuration did not deserialize ({err}); falling back to defaults");
            defaults
        }
    }
}

/// Parse one configuration document, reporting where a rejected one came
/// from. Blank input is silently skipped.
fn parse_json(raw: &str, origin: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed)
        .map_err(|err| eprintln!("Ignoring config from {origin}: {err}"))
        .ok()
}

/// Overlay the JSON document at `path` onto `target`, if it exists and
/// parses. Missing files are fine; unreadable ones are reported.
fn merge_json_file(target: &mut Value, path: &Path) {
    if !path.is_file() {
        return;
    }
    let origin = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(patch) = parse_json(&contents, &origin) {
                overlay(target, patch);
            }
        }
        Err(err) => eprintln!("Ignoring unreadable config file {origin}: {err}"),
    }
}

/// Recursively lay `patch` over `base`: objects merge key by key; anything
/// else (scalars, arrays) replaces the existing value wholesale.
fn overlay(base: &mut Value, patch: Value) {
    match patch {
        Value::Object(entries) => {
            if !base.is_object() {
                *base = Value::Object(serde_json::Map::new());
            }
            if let Some(base_map) = base.as_object_mut() {
                for (key, value) in entries {
                    overlay(base_map.entry(key).or_insert(Value::Null), value);
                }
            }
        }
        replacement => *base = replacement,
    }
}

/// Fold `QUIZ_ROYALE__SECTION__FIELD=value` environment variables into the
/// merged document.
fn apply_env_overrides(root: &mut Value) {
    let overrides = std::env::vars().filter_map(|(key, raw)| {
        let path = key.strip_prefix("QUIZ_ROYALE__")?;
        let segments: Vec<String> = path
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        (!segments.is_empty()).then(|| (segments, env_value(&raw)))
    });

    for (segments, value) in overrides {
        set_path(root, &segments, value);
    }
}

/// Interpret an environment value: anything that parses as a JSON scalar
/// (number, boolean, null, quoted string) passes through typed; everything
/// else stays a plain string.
fn env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_owned()))
}

/// Write `value` at the nested object path named by `segments`, creating or
/// coercing intermediate objects as needed.
fn set_path(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Some(map) = target.as_object_mut() {
        let slot = map.entry(head.clone()).or_insert(Value::Null);
        if rest.is_empty() {
            *slot = value;
        } else {
            set_path(slot, rest, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with("QUIZ_ROYALE") {
                std::env::remove_var(&key);
            }
        }
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("MIN_PLAYERS");
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_sources() {
        clear_env();
        let config = load();
        assert_eq!(config.port, Config::default().port);
        assert_eq!(config.server.min_players, 3);
    }

    #[test]
    #[serial]
    fn test_inline_json_overrides_defaults() {
        clear_env();
        std::env::set_var(
            "QUIZ_ROYALE_CONFIG_JSON",
            r#"{"port": 9001, "server": {"min_players": 5}}"#,
        );
        let config = load();
        std::env::remove_var("QUIZ_ROYALE_CONFIG_JSON");

        assert_eq!(config.port, 9001);
        assert_eq!(config.server.min_players, 5);
        // Untouched sections keep their defaults.
        assert_eq!(config.game.round_timer_secs, 10);
    }

    #[test]
    #[serial]
    fn test_nested_env_override() {
        clear_env();
        std::env::set_var("QUIZ_ROYALE__GAME__ROUND_TIMER_SECS", "25");
        std::env::set_var("QUIZ_ROYALE__SERVER__SINGLE_REPLICA", "true");
        let config = load();
        std::env::remove_var("QUIZ_ROYALE__GAME__ROUND_TIMER_SECS");
        std::env::remove_var("QUIZ_ROYALE__SERVER__SINGLE_REPLICA");

        assert_eq!(config.game.round_timer_secs, 25);
        assert!(config.server.single_replica);
    }

    #[test]
    #[serial]
    fn test_bare_redis_url_and_min_players() {
        clear_env();
        std::env::set_var("REDIS_URL", "redis://example.internal:6380");
        std::env::set_var("MIN_PLAYERS", "2");
        let config = load();
        clear_env();

        assert_eq!(config.server.redis_url, "redis://example.internal:6380");
        assert_eq!(config.server.min_players, 2);
    }

    #[test]
    fn test_overlay_merges_objects_and_replaces_scalars() {
        let mut base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        overlay(
            &mut base,
            serde_json::json!({"a": {"c": 3}, "d": [9], "e": "new"}),
        );
        assert_eq!(
            base,
            serde_json::json!({"a": {"b": 1, "c": 3}, "d": [9], "e": "new"})
        );
    }

    #[test]
    fn test_set_path_coerces_scalars_into_objects() {
        let mut target = serde_json::json!({"server": "oops"});
        set_path(
            &mut target,
            &["server".to_string(), "min_players".to_string()],
            serde_json::json!(4),
        );
        assert_eq!(target, serde_json::json!({"server": {"min_players": 4}}));
    }

    #[test]
    fn test_env_value_types_scalars() {
        assert_eq!(env_value("42"), serde_json::json!(42));
        assert_eq!(env_value("true"), serde_json::json!(true));
        assert_eq!(env_value("plain text"), serde_json::json!("plain text"));
        assert_eq!(env_value(" 7 "), serde_json::json!(7));
    }
}

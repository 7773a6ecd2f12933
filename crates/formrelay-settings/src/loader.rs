//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If a settings file is given and exists, deep-merge its values over defaults
//! 3. Load `.env` from the working directory (existing variables win)
//! 4. Apply environment variable overrides
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Load settings from all layers and validate the result.
pub fn load_settings(path: Option<&Path>) -> Result<RelaySettings> {
    let mut settings = match path {
        Some(p) => load_settings_from_path(p)?,
        None => RelaySettings::default(),
    };

    match dotenvy::dotenv() {
        Ok(env_path) => debug!(path = %env_path.display(), "loaded .env file"),
        Err(e) if e.not_found() => debug!(".env file not found, skipping"),
        Err(e) => warn!(error = %e, "failed to load .env file, ignoring"),
    }

    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a JSON file merged over defaults.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let parse_err = |source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(RelaySettings::default()).map_err(parse_err)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(parse_err)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(parse_err)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides.
pub fn apply_env_overrides(settings: &mut RelaySettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Empty values are treated as unset. Values that fail to parse are
/// ignored with a warning.
pub fn apply_overrides_from<F>(settings: &mut RelaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("HOST") {
        settings.host = v;
    }
    if let Some(v) = read("PORT") {
        match parse_u16_range(&v, 0, u16::MAX) {
            Some(port) => settings.port = port,
            None => warn!(key = "PORT", value = %v, "invalid port env var, ignoring"),
        }
    }
    if let Some(v) = read("LOG_LEVEL") {
        settings.log_level = v.to_lowercase();
    }
    if let Some(v) = read("RELOAD") {
        match parse_bool(&v) {
            Some(b) => settings.reload = b,
            None => warn!(key = "RELOAD", value = %v, "invalid boolean env var, ignoring"),
        }
    }
    if let Some(v) = read("MAX_CONNECTIONS") {
        match parse_usize_range(&v, 1, 1_000_000) {
            Some(n) => settings.max_connections = n,
            None => warn!(key = "MAX_CONNECTIONS", value = %v, "invalid usize env var, ignoring"),
        }
    }
    if let Some(v) = read("HEARTBEAT_INTERVAL_SECS") {
        match parse_u64_range(&v, 0, 3600) {
            Some(n) => settings.heartbeat_interval_secs = n,
            None => {
                warn!(key = "HEARTBEAT_INTERVAL_SECS", value = %v, "invalid u64 env var, ignoring");
            }
        }
    }
    if let Some(v) = read("HEARTBEAT_TIMEOUT_SECS") {
        match parse_u64_range(&v, 0, 86_400) {
            Some(n) => settings.heartbeat_timeout_secs = n,
            None => {
                warn!(key = "HEARTBEAT_TIMEOUT_SECS", value = %v, "invalid u64 env var, ignoring");
            }
        }
    }
    if let Some(v) = read("MAX_MESSAGE_SIZE") {
        match parse_usize_range(&v, 1024, 64 * 1024 * 1024) {
            Some(n) => settings.max_message_size = n,
            None => warn!(key = "MAX_MESSAGE_SIZE", value = %v, "invalid usize env var, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> RelaySettings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let mut settings = RelaySettings::default();
        apply_overrides_from(&mut settings, |name| vars.get(name).cloned());
        settings
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": 10});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8080, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, RelaySettings::default());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, r#"{"port": 9001, "logLevel": "debug"}"#).unwrap();
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.port, 9001);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.host, "0.0.0.0");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { ref path, .. } if path.ends_with("relay.json")));
    }

    #[test]
    fn wrong_field_type_in_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, r#"{"port": "eighty"}"#).unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings_from_path(dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_sets_listener_fields() {
        let s = overrides(&[("HOST", "127.0.0.1"), ("PORT", "9002"), ("LOG_LEVEL", "DEBUG")]);
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.port, 9002);
        assert_eq!(s.log_level, "debug");
    }

    #[test]
    fn env_reload_false() {
        let s = overrides(&[("RELOAD", "false")]);
        assert!(!s.reload);
    }

    #[test]
    fn env_reload_garbage_ignored() {
        let s = overrides(&[("RELOAD", "maybe")]);
        assert!(s.reload);
    }

    #[test]
    fn env_bad_port_ignored() {
        let s = overrides(&[("PORT", "not-a-port")]);
        assert_eq!(s.port, 8000);
        let s = overrides(&[("PORT", "70000")]);
        assert_eq!(s.port, 8000);
    }

    #[test]
    fn env_empty_value_is_unset() {
        let s = overrides(&[("HOST", "")]);
        assert_eq!(s.host, "0.0.0.0");
    }

    #[test]
    fn env_bounds() {
        let s = overrides(&[
            ("MAX_CONNECTIONS", "8"),
            ("HEARTBEAT_INTERVAL_SECS", "5"),
            ("HEARTBEAT_TIMEOUT_SECS", "15"),
            ("MAX_MESSAGE_SIZE", "4096"),
        ]);
        assert_eq!(s.max_connections, 8);
        assert_eq!(s.heartbeat_interval_secs, 5);
        assert_eq!(s.heartbeat_timeout_secs, 15);
        assert_eq!(s.max_message_size, 4096);
    }

    #[test]
    fn env_zero_connections_ignored() {
        let s = overrides(&[("MAX_CONNECTIONS", "0")]);
        assert_eq!(s.max_connections, 1024);
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(" no "), Some(false));
        assert_eq!(parse_bool("nah"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("80", 1, 100), Some(80));
        assert_eq!(parse_u16_range("0", 1, 100), None);
        assert_eq!(parse_u64_range("7", 0, 5), None);
        assert_eq!(parse_usize_range("12", 10, 20), Some(12));
    }
}

//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment prefix for path-style overrides, e.g. `AISTAI__CHAT__HISTORY_LIMIT=40`
const PATH_PREFIX: &str = "AISTAI__";

/// Well-known environment variables mapped onto config paths.
/// Later entries win, so `WEBHOOK_BASE_URL` beats `RENDER_EXTERNAL_URL`.
const ALIASES: &[(&str, &str, bool)] = &[
    ("TELEGRAM_TOKEN", "telegram.token", false),
    ("OPENAI_API_KEY", "openai.api_key", false),
    ("OPENAI_BASE_URL", "openai.api_base", false),
    ("RENDER_EXTERNAL_URL", "telegram.webhook.base_url", false),
    ("WEBHOOK_BASE_URL", "telegram.webhook.base_url", false),
    ("PORT", "telegram.webhook.port", true),
];

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".aistai"))
            .unwrap_or_else(|| PathBuf::from(".aistai"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment, then validate it
    pub fn load(&self) -> crate::Result<Config> {
        let config = self.load_unchecked()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration without validation (used by `status`)
    pub fn load_unchecked(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        Ok(serde_json::from_value(merged)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the JSON config file
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(last.clone(), value);
    }
}

fn apply_alias_overrides(config: &mut Value) {
    for (env_key, target_path, typed) in ALIASES {
        if let Ok(raw) = std::env::var(env_key) {
            if raw.trim().is_empty() {
                continue;
            }
            let value = if *typed {
                parse_env_value(&raw)
            } else {
                Value::String(raw)
            };
            let path: Vec<String> = target_path.split('.').map(ToString::to_string).collect();
            set_path_value(config, &path, value);
        }
    }
}

fn apply_path_overrides(config: &mut Value) {
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(PATH_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.is_empty() {
            continue;
        }
        set_path_value(config, &segments, parse_env_value(&value));
    }
}

//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for aistai
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram bot configuration
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Completion API configuration
    #[serde(default)]
    pub openai: OpenAIConfig,
    /// Conversation settings
    #[serde(default)]
    pub chat: ChatConfig,
    /// Model registry overrides
    #[serde(default)]
    pub models: ModelsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files, empty disables file logging
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// How updates reach the bot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Long polling against the Bot API
    #[default]
    Polling,
    /// Telegram pushes updates to an HTTP endpoint we serve
    Webhook,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Polling => "polling",
            TransportMode::Webhook => "webhook",
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" | "poll" => Ok(TransportMode::Polling),
            "webhook" => Ok(TransportMode::Webhook),
            other => Err(format!("unknown transport mode: {}", other)),
        }
    }
}

/// Telegram bot configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot API token
    #[serde(default)]
    pub token: String,
    /// Update delivery mode
    #[serde(default)]
    pub mode: TransportMode,
    /// Webhook settings, used when `mode` is `webhook`
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Webhook endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Externally reachable base URL, e.g. `https://bot.example.com`
    #[serde(default)]
    pub base_url: String,
    /// Local port to listen on
    #[serde(default = "default_webhook_port")]
    pub port: u16,
    /// Path prefix; the bot token is appended as the last segment
    #[serde(default = "default_webhook_path")]
    pub path: String,
}

fn default_webhook_port() -> u16 {
    10000
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            port: default_webhook_port(),
            path: default_webhook_path(),
        }
    }
}

impl WebhookConfig {
    /// Full public URL Telegram should post updates to.
    pub fn endpoint_url(&self, token: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!("{}/{}", base, token)
        } else {
            format!("{}/{}/{}", base, path, token)
        }
    }
}

/// Completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Conversation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model code given to new sessions
    #[serde(default = "default_model_code")]
    pub default_model: String,
    /// Maximum number of turns kept per user
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional completion length cap
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Whether the failure notice is written into history as an assistant turn
    #[serde(default = "default_record_failures")]
    pub record_failures: bool,
    /// Maximum resident sessions before the least recently used is evicted (0 = unbounded)
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_model_code() -> String {
    "gpt4o".to_string()
}

fn default_history_limit() -> usize {
    30
}

fn default_temperature() -> f64 {
    0.7
}

fn default_record_failures() -> bool {
    true
}

fn default_max_sessions() -> usize {
    10_000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model_code(),
            history_limit: default_history_limit(),
            temperature: default_temperature(),
            max_tokens: None,
            record_failures: default_record_failures(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Model registry overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsConfig {
    /// Model code -> provider model id
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.telegram.mode, TransportMode::Polling);
        assert_eq!(config.telegram.webhook.port, 10000);
        assert_eq!(config.chat.history_limit, 30);
        assert_eq!(config.chat.default_model, "gpt4o");
        assert!((config.chat.temperature - 0.7).abs() < f64::EPSILON);
        assert!(config.chat.record_failures);
        assert_eq!(config.openai.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"telegram":{"token":"abc","mode":"webhook"}}"#).unwrap();
        assert_eq!(config.telegram.token, "abc");
        assert_eq!(config.telegram.mode, TransportMode::Webhook);
        assert_eq!(config.telegram.webhook.path, "/webhook");
        assert_eq!(config.chat.max_sessions, 10_000);
    }

    #[test]
    fn test_webhook_endpoint_url() {
        let webhook = WebhookConfig {
            base_url: "https://bot.example.com/".to_string(),
            ..WebhookConfig::default()
        };
        assert_eq!(
            webhook.endpoint_url("123:ABC"),
            "https://bot.example.com/webhook/123:ABC"
        );

        let bare = WebhookConfig {
            base_url: "https://bot.example.com".to_string(),
            path: "/".to_string(),
            ..WebhookConfig::default()
        };
        assert_eq!(bare.endpoint_url("t"), "https://bot.example.com/t");
    }

    #[test]
    fn test_transport_mode_from_str() {
        assert_eq!("Webhook".parse::<TransportMode>(), Ok(TransportMode::Webhook));
        assert_eq!("polling".parse::<TransportMode>(), Ok(TransportMode::Polling));
        assert!("carrier-pigeon".parse::<TransportMode>().is_err());
    }
}

//! Configuration validation rules.

use super::schema::{Config, TransportMode};

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.telegram.token.trim().is_empty() {
        errors.push("telegram.token is required (set TELEGRAM_TOKEN)".to_string());
    }
    if config.openai.api_key.trim().is_empty() {
        errors.push("openai.api_key is required (set OPENAI_API_KEY)".to_string());
    }
    if config.openai.api_base.trim().is_empty() {
        errors.push("openai.api_base must not be empty".to_string());
    }

    if config.telegram.mode == TransportMode::Webhook {
        let base_url = config.telegram.webhook.base_url.trim();
        if base_url.is_empty() {
            errors.push(
                "telegram.webhook.base_url is required in webhook mode (set WEBHOOK_BASE_URL)"
                    .to_string(),
            );
        } else if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            errors.push("telegram.webhook.base_url must be an http(s) URL".to_string());
        }
        if config.telegram.webhook.port == 0 {
            errors.push("telegram.webhook.port must be > 0".to_string());
        }
    }

    if config.chat.history_limit == 0 {
        errors.push("chat.history_limit must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.chat.temperature) {
        errors.push("chat.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.chat.max_tokens == Some(0) {
        errors.push("chat.max_tokens must be > 0 when set".to_string());
    }
    if config.chat.default_model.trim().is_empty() {
        errors.push("chat.default_model must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.telegram.token = "123:abc".to_string();
        config.openai.api_key = "sk-test".to_string();
        config
    }

    #[test]
    fn test_validate_accepts_credentials_with_defaults() {
        validate_config(&valid_config()).unwrap();
    }

    #[test]
    fn test_validate_reports_every_missing_credential() {
        let err = validate_config(&Config::default()).unwrap_err().to_string();
        assert!(err.contains("telegram.token"));
        assert!(err.contains("openai.api_key"));
    }

    #[test]
    fn test_validate_webhook_requires_base_url() {
        let mut config = valid_config();
        config.telegram.mode = TransportMode::Webhook;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("telegram.webhook.base_url"));

        config.telegram.webhook.base_url = "bot.example.com".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("http(s) URL"));

        config.telegram.webhook.base_url = "https://bot.example.com".to_string();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_chat_settings() {
        let mut config = valid_config();
        config.chat.history_limit = 0;
        config.chat.temperature = 2.5;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("chat.history_limit"));
        assert!(err.contains("chat.temperature"));
    }
}

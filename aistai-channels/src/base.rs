//! Shared channel error type

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChannelError::NotConfigured("Telegram token not configured".to_string());
        assert_eq!(
            err.to_string(),
            "Channel not configured: Telegram token not configured"
        );
    }
}

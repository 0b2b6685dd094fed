//! Base trait for LLM providers

use aistai_core::session::{Role, Turn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// True when the request never produced an HTTP response within the deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::HttpError(e) if e.is_timeout())
    }

    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            ProviderError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: HashMap<String, i64>,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

/// A message in the chat conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        match turn.role {
            Role::User => Message::user(turn.content.clone()),
            Role::Assistant => Message::assistant(turn.content.clone()),
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: f64,
    ) -> ProviderResult<LLMResponse>;

    /// Get the default model for this provider
    fn get_default_model(&self) -> String;
}

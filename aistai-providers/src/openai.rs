//! OpenAI-compatible chat completions client

use aistai_core::config::OpenAIConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};

/// Chat completions request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f64,
}

/// Chat completions response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

/// `{"error": {"message": ...}}` envelope returned on failures
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// OpenAI-compatible provider client
pub struct OpenAIClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    extra_headers: HashMap<String, String>,
}

impl OpenAIClient {
    /// Create a new client. A zero `timeout` disables the request deadline.
    pub fn new(
        api_key: Option<String>,
        api_base: impl Into<String>,
        default_model: impl Into<String>,
        extra_headers: HashMap<String, String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let mut builder = Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            default_model: default_model.into(),
            extra_headers,
        })
    }

    /// Build a client from the `openai` config section
    pub fn from_config(
        config: &OpenAIConfig,
        default_model: impl Into<String>,
    ) -> ProviderResult<Self> {
        if config.api_base.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "openai.api_base is empty".to_string(),
            ));
        }
        Self::new(
            Some(config.api_key.clone()),
            config.api_base.clone(),
            default_model,
            config.extra_headers.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        req_builder
    }

    fn parse_response(response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        let mut usage = HashMap::new();
        usage.insert("prompt_tokens".to_string(), response.usage.prompt_tokens);
        usage.insert(
            "completion_tokens".to_string(),
            response.usage.completion_tokens,
        );
        usage.insert("total_tokens".to_string(), response.usage.total_tokens);

        Ok(LLMResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string())
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatCompletionRequest {
            model: &model,
            messages: &messages,
            max_tokens,
            temperature,
        };

        debug!(
            "Sending chat request to {} with model {} ({} messages)",
            self.api_base,
            model,
            messages.len()
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .apply_headers(self.client.post(&url).json(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: Self::error_message(&error_text),
            });
        }

        let body = response.text().await?;
        let response_data: ChatCompletionResponse = serde_json::from_str(&body)?;
        Self::parse_response(response_data)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}

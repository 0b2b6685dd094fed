//! Completion relay: history windowing around one completion call

use aistai_core::config::ChatConfig;
use aistai_core::session::{SessionHandle, Turn};
use aistai_core::ModelRegistry;
use aistai_providers::{LLMProvider, Message, ProviderError};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shown to the user (and by default recorded in history) when a completion fails
pub const FAILURE_NOTICE: &str = "⚠️ An error occurred while contacting the model.\n\
Check that the OpenAI API key and model are configured correctly.";

/// Why a completion produced no usable reply
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("model returned no text")]
    EmptyReply,
}

impl RelayError {
    /// Short failure class for logs: timeout, HTTP status or the generic case
    pub fn summary(&self) -> String {
        match self {
            RelayError::Provider(e) if e.is_timeout() => "timed out".to_string(),
            RelayError::Provider(e) => match e.status() {
                Some(status) => format!("HTTP {}", status),
                None => "request failed".to_string(),
            },
            RelayError::EmptyReply => "empty reply".to_string(),
        }
    }
}

/// Result of one relayed turn
#[derive(Debug)]
pub enum Completion {
    /// The model answered; the text is already trimmed
    Replied(String),
    /// Upstream failed; `notice` is what the user should see
    Failed { error: RelayError, notice: String },
}

impl Completion {
    /// Text to send back to the user in either case
    pub fn text(&self) -> &str {
        match self {
            Completion::Replied(text) => text,
            Completion::Failed { notice, .. } => notice,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Completion::Replied(text) => text,
            Completion::Failed { notice, .. } => notice,
        }
    }
}

/// Tunables for the relay, usually taken from the `chat` config section
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub history_limit: usize,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub record_failures: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for RelaySettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            record_failures: config.record_failures,
        }
    }
}

/// Appends turns to a session and asks the provider for the next reply
pub struct CompletionRelay {
    provider: Arc<dyn LLMProvider>,
    registry: Arc<ModelRegistry>,
    settings: RelaySettings,
}

impl CompletionRelay {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ModelRegistry>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            provider,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Relay one user utterance.
    ///
    /// The session stays locked for the whole turn, so concurrent messages
    /// from the same user are answered one after another. Provider failures
    /// never escape: they come back as [`Completion::Failed`].
    pub async fn respond(&self, session: &SessionHandle, user_text: &str) -> Completion {
        let limit = self.settings.history_limit;
        let mut session = session.lock().await;

        session.push_turn(Turn::user(user_text), limit);

        let model = self.registry.resolve(&session.model_code).to_string();
        let messages: Vec<Message> = session.history.iter().map(Message::from).collect();
        debug!(
            "Relaying {} turns to {} (code {})",
            messages.len(),
            model,
            session.model_code
        );

        match self.complete(messages, model.clone()).await {
            Ok(text) => {
                session.push_turn(Turn::assistant(text.clone()), limit);
                Completion::Replied(text)
            }
            Err(e) => {
                error!("Completion request to {} failed ({}): {}", model, e.summary(), e);
                let notice = FAILURE_NOTICE.to_string();
                if self.settings.record_failures {
                    session.push_turn(Turn::assistant(notice.clone()), limit);
                } else {
                    info!("Failure notice kept out of history");
                }
                Completion::Failed { error: e, notice }
            }
        }
    }

    async fn complete(&self, messages: Vec<Message>, model: String) -> Result<String, RelayError> {
        let response = self
            .provider
            .chat(
                messages,
                Some(model),
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await?;

        response
            .content
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(RelayError::EmptyReply)
    }
}

//! Command, callback and text routing
//!
//! The router knows nothing about Telegram. Every entry point returns the
//! reply to show, and the channel adapter decides how to deliver it.

use crate::menu::{self, CallbackAction, Keyboard};
use crate::relay::{Completion, CompletionRelay};
use aistai_core::{ModelRegistry, SessionHandle, SessionStore, UserId};
use std::sync::Arc;
use tracing::{debug, info};

/// How the reply text should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Model output; the adapter may convert it to rich markup
    Markdown,
}

/// A message to send or an edit to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub format: TextFormat,
}

impl Reply {
    fn with_main_menu(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(menu::main_menu()),
            format: TextFormat::Plain,
        }
    }
}

/// Result of routing a callback query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Replace the originating message with this content
    Edit(Reply),
    /// Acknowledge only
    Ignore,
}

pub struct ChatRouter {
    sessions: Arc<SessionStore>,
    registry: Arc<ModelRegistry>,
    relay: CompletionRelay,
}

impl ChatRouter {
    pub fn new(
        sessions: Arc<SessionStore>,
        registry: Arc<ModelRegistry>,
        relay: CompletionRelay,
    ) -> Self {
        Self {
            sessions,
            registry,
            relay,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// `/start`: make sure the user has a session and show the main menu
    pub fn handle_start(&self, user_id: UserId) -> Reply {
        self.sessions.get_or_create(user_id);
        info!("User {} started the bot", user_id);
        Reply::with_main_menu(menu::WELCOME_TEXT)
    }

    /// `/reset`: same effect as the "New chat" button
    pub async fn handle_reset(&self, user_id: UserId) -> Reply {
        let session = self.sessions.get_or_create(user_id);
        self.clear_history(user_id, &session).await;
        Reply::with_main_menu(menu::NEW_CHAT_TEXT)
    }

    /// Route a button press. Any callback, even an unknown one, registers the user.
    pub async fn handle_callback(&self, user_id: UserId, payload: &str) -> CallbackOutcome {
        let session = self.sessions.get_or_create(user_id);
        let action = CallbackAction::parse(payload);
        debug!("Callback from user {}: {:?}", user_id, action);

        let reply = match action {
            CallbackAction::ChangeModel => {
                let current = session.lock().await.model_code.clone();
                Reply {
                    text: menu::MODEL_SELECT_TEXT.to_string(),
                    keyboard: Some(menu::model_menu(&self.registry, &current)),
                    format: TextFormat::Plain,
                }
            }
            CallbackAction::NewChat => {
                self.clear_history(user_id, &session).await;
                Reply::with_main_menu(menu::NEW_CHAT_TEXT)
            }
            CallbackAction::AboutBot => Reply::with_main_menu(menu::ABOUT_TEXT),
            CallbackAction::BackToMenu => Reply::with_main_menu(menu::MAIN_MENU_TEXT),
            CallbackAction::SetModel(code) => {
                session.lock().await.set_model(code.as_str());
                info!("User {} switched model to {}", user_id, code);
                Reply::with_main_menu(format!(
                    "Model changed to: {}",
                    self.registry.display_name(&code)
                ))
            }
            CallbackAction::Unknown(raw) => {
                debug!("Ignoring unknown callback payload {:?}", raw);
                return CallbackOutcome::Ignore;
            }
        };

        CallbackOutcome::Edit(reply)
    }

    /// Relay a text message. Returns `None` when there is nothing to answer.
    pub async fn handle_text(&self, user_id: UserId, text: Option<&str>) -> Option<Reply> {
        let text = text.filter(|text| !text.is_empty())?;
        let session = self.sessions.get_or_create(user_id);

        let completion = self.relay.respond(&session, text).await;
        let format = match &completion {
            Completion::Replied(_) => TextFormat::Markdown,
            Completion::Failed { .. } => TextFormat::Plain,
        };

        Some(Reply {
            text: completion.into_text(),
            keyboard: Some(menu::main_menu()),
            format,
        })
    }

    async fn clear_history(&self, user_id: UserId, session: &SessionHandle) {
        session.lock().await.clear_history();
        info!("Cleared conversation history for user {}", user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RelaySettings, FAILURE_NOTICE};
    use aistai_providers::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedProvider(Option<&'static str>);

    #[async_trait]
    impl LLMProvider for FixedProvider {
        async fn chat(
            &self,
            _messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: Option<u32>,
            _temperature: f64,
        ) -> ProviderResult<LLMResponse> {
            match self.0 {
                Some(text) => Ok(LLMResponse {
                    content: Some(text.to_string()),
                    finish_reason: "stop".to_string(),
                    usage: HashMap::new(),
                }),
                None => Err(ProviderError::InvalidResponse("boom".to_string())),
            }
        }

        fn get_default_model(&self) -> String {
            "gpt-4o".to_string()
        }
    }

    fn router(reply: Option<&'static str>) -> ChatRouter {
        let registry = Arc::new(ModelRegistry::new());
        let relay = CompletionRelay::new(
            Arc::new(FixedProvider(reply)),
            registry.clone(),
            RelaySettings::default(),
        );
        ChatRouter::new(Arc::new(SessionStore::new("gpt4o", 0)), registry, relay)
    }

    #[test]
    fn test_start_creates_session_and_shows_menu() {
        let router = router(Some("ok"));
        let reply = router.handle_start(7);
        assert_eq!(reply.text, menu::WELCOME_TEXT);
        assert_eq!(reply.keyboard, Some(menu::main_menu()));
        assert_eq!(router.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_change_model_shows_current_selection() {
        let router = router(Some("ok"));
        let outcome = router.handle_callback(7, "change_model").await;
        let CallbackOutcome::Edit(reply) = outcome else {
            panic!("expected an edit");
        };
        assert_eq!(reply.text, menu::MODEL_SELECT_TEXT);
        let keyboard = reply.keyboard.unwrap();
        assert_eq!(keyboard.rows[2][0].label, "✅ GPT-4o");
    }

    #[tokio::test]
    async fn test_set_model_reports_display_name() {
        let router = router(Some("ok"));
        let outcome = router.handle_callback(7, "set_model:gpt5_instance").await;
        assert_eq!(
            outcome,
            CallbackOutcome::Edit(Reply::with_main_menu("Model changed to: GPT-5 Instance"))
        );

        let session = router.sessions().get(7).unwrap();
        assert_eq!(session.lock().await.model_code, "gpt5_instance");
    }

    #[tokio::test]
    async fn test_unknown_payload_is_ignored() {
        let router = router(Some("ok"));
        assert_eq!(
            router.handle_callback(7, "nonsense").await,
            CallbackOutcome::Ignore
        );
    }

    #[tokio::test]
    async fn test_about_and_back() {
        let router = router(Some("ok"));
        assert_eq!(
            router.handle_callback(7, "about_bot").await,
            CallbackOutcome::Edit(Reply::with_main_menu(menu::ABOUT_TEXT))
        );
        assert_eq!(
            router.handle_callback(7, "back_to_menu").await,
            CallbackOutcome::Edit(Reply::with_main_menu("Main menu:"))
        );
    }

    #[tokio::test]
    async fn test_every_callback_registers_the_user() {
        let router = router(Some("ok"));
        router.handle_callback(7, "about_bot").await;
        router.handle_callback(8, "back_to_menu").await;
        assert_eq!(
            router.handle_callback(9, "nonsense").await,
            CallbackOutcome::Ignore
        );

        assert_eq!(router.sessions().len(), 3);
        for user in [7, 8, 9] {
            let session = router.sessions().get(user).unwrap();
            let session = session.lock().await;
            assert_eq!(session.model_code, "gpt4o");
            assert!(session.history.is_empty());
        }
    }

    #[tokio::test]
    async fn test_text_reply_is_markdown_with_menu() {
        let router = router(Some("**bold** answer"));
        let reply = router.handle_text(7, Some("question")).await.unwrap();
        assert_eq!(reply.text, "**bold** answer");
        assert_eq!(reply.format, TextFormat::Markdown);
        assert_eq!(reply.keyboard, Some(menu::main_menu()));
    }

    #[tokio::test]
    async fn test_failed_text_reply_is_plain_notice() {
        let router = router(None);
        let reply = router.handle_text(7, Some("question")).await.unwrap();
        assert_eq!(reply.text, FAILURE_NOTICE);
        assert_eq!(reply.format, TextFormat::Plain);
    }

    #[tokio::test]
    async fn test_missing_text_is_ignored_without_session() {
        let router = router(Some("ok"));
        assert!(router.handle_text(7, None).await.is_none());
        assert!(router.handle_text(7, Some("")).await.is_none());
        assert!(router.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let router = router(Some("ok"));
        router.handle_text(7, Some("hi")).await;
        let reply = router.handle_reset(7).await;
        assert_eq!(reply.text, menu::NEW_CHAT_TEXT);
        let session = router.sessions().get(7).unwrap();
        assert!(session.lock().await.history.is_empty());
    }
}

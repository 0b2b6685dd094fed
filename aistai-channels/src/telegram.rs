//! Telegram channel integration

use crate::base::{ChannelError, Result};
use aistai_agent::{CallbackOutcome, ChatRouter, Keyboard, Reply, TextFormat};
use aistai_core::config::{TelegramConfig, TransportMode, WebhookConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Telegram bot commands
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "aistai commands:")]
enum Command {
    /// Start the bot
    #[command(description = "Start the bot")]
    Start,
    /// Reset conversation history
    #[command(description = "Start a new chat")]
    Reset,
}

/// Seconds between repeated "typing" chat actions
const TYPING_INTERVAL_SECS: u64 = 4;

/// Per-chat typing indicator loops
#[derive(Clone, Default)]
struct TypingIndicators {
    tasks: Arc<Mutex<HashMap<ChatId, JoinHandle<()>>>>,
}

impl TypingIndicators {
    async fn start(&self, bot: Bot, chat_id: ChatId) {
        let handle = tokio::spawn(async move {
            loop {
                let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
                tokio::time::sleep(tokio::time::Duration::from_secs(TYPING_INTERVAL_SECS)).await;
            }
        });

        if let Some(previous) = self.tasks.lock().await.insert(chat_id, handle) {
            previous.abort();
        }
    }

    async fn stop(&self, chat_id: ChatId) {
        if let Some(handle) = self.tasks.lock().await.remove(&chat_id) {
            handle.abort();
        }
    }

    async fn stop_all(&self) {
        for (_, handle) in self.tasks.lock().await.drain() {
            handle.abort();
        }
    }
}

/// State shared with every dispatcher endpoint
struct BotState {
    router: Arc<ChatRouter>,
    typing: TypingIndicators,
}

/// Telegram channel handler
pub struct TelegramHandler {
    token: String,
    mode: TransportMode,
    webhook: WebhookConfig,
    router: Arc<ChatRouter>,
    typing: TypingIndicators,
}

impl TelegramHandler {
    /// Create a new Telegram handler from config
    pub fn new(config: &TelegramConfig, router: Arc<ChatRouter>) -> Self {
        Self {
            token: config.token.clone(),
            mode: config.mode,
            webhook: config.webhook.clone(),
            router,
            typing: TypingIndicators::default(),
        }
    }

    /// Public URL Telegram posts updates to in webhook mode
    pub fn webhook_url(&self) -> Result<url::Url> {
        if self.webhook.base_url.trim().is_empty() {
            return Err(ChannelError::InvalidConfig(
                "webhook mode requires telegram.webhook.base_url (set WEBHOOK_BASE_URL)"
                    .to_string(),
            ));
        }
        let raw = self.webhook.endpoint_url(&self.token);
        url::Url::parse(&raw).map_err(|e| {
            ChannelError::InvalidConfig(format!(
                "invalid webhook url {}: {}",
                self.webhook.base_url, e
            ))
        })
    }

    /// Run the bot until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        if self.token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "Telegram token not configured".to_string(),
            ));
        }

        // Fail on a bad webhook url before talking to Telegram
        let webhook_url = match self.mode {
            TransportMode::Webhook => Some(self.webhook_url()?),
            TransportMode::Polling => None,
        };

        tracing::info!("Starting Telegram bot ({} mode)...", self.mode.as_str());

        let bot = Bot::new(&self.token);

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            tracing::warn!("Failed to set bot commands: {}", e);
        }

        match bot.get_me().await {
            Ok(me) => {
                let username = me.username.clone().unwrap_or_else(|| "unknown".to_string());
                tracing::info!("Telegram bot @{} connected", username);
            }
            Err(e) => {
                return Err(ChannelError::ApiError(format!(
                    "Failed to get bot info: {}",
                    e
                )));
            }
        }

        let state = Arc::new(BotState {
            router: self.router.clone(),
            typing: self.typing.clone(),
        });

        let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
            .dependencies(dptree::deps![state])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.kind);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "Error in update handler",
            ))
            .enable_ctrlc_handler()
            .build();

        match webhook_url {
            Some(url) => {
                let address = SocketAddr::from(([0, 0, 0, 0], self.webhook.port));
                tracing::info!(
                    "Serving webhook on {} for {}",
                    address,
                    mask_token(url.as_str(), &self.token)
                );
                let listener = webhooks::axum(bot, webhooks::Options::new(address, url))
                    .await
                    .map_err(|e| {
                        ChannelError::ConnectionFailed(format!("Failed to set webhook: {}", e))
                    })?;
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("Error from the webhook listener"),
                    )
                    .await;
            }
            None => {
                // A leftover webhook would block getUpdates
                if let Err(e) = bot.delete_webhook().await {
                    tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
                }
                dispatcher.dispatch().await;
            }
        }

        self.typing.stop_all().await;
        tracing::info!("Telegram bot stopped");
        Ok(())
    }
}

fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler))
}

async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let reply = match cmd {
        Command::Start => state.router.handle_start(user.id.0),
        Command::Reset => state.router.handle_reset(user.id.0).await,
    };

    if let Err(e) = send_reply(&bot, msg.chat.id, &reply).await {
        tracing::error!("Error handling {:?}: {}", cmd, e);
    }
    Ok(())
}

async fn callback_handler(bot: Bot, query: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let user_id = query.from.id.0;
    let payload = query.data.as_deref().unwrap_or_default();

    tracing::debug!("Callback query: user={}, data={}", user_id, payload);

    if let CallbackOutcome::Edit(reply) = state.router.handle_callback(user_id, payload).await {
        match &query.message {
            Some(message) => {
                if let Err(e) = edit_reply(&bot, message.chat().id, message.id(), &reply).await {
                    tracing::warn!("Failed to update menu message: {}", e);
                }
            }
            None => tracing::debug!("Callback without an attached message, nothing to edit"),
        }
    }

    if let Err(e) = bot.answer_callback_query(&query.id).await {
        tracing::warn!("Failed to answer callback query: {}", e);
    }
    Ok(())
}

async fn message_handler(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text().filter(|text| !text.is_empty()) else {
        return Ok(());
    };

    let chat_id = msg.chat.id;
    tracing::info!(
        "Message received: user={}, chat={}, {} chars",
        user.id.0,
        chat_id.0,
        text.chars().count()
    );

    state.typing.start(bot.clone(), chat_id).await;
    let reply = state.router.handle_text(user.id.0, Some(text)).await;
    state.typing.stop(chat_id).await;

    if let Some(reply) = reply {
        if let Err(e) = send_reply(&bot, chat_id, &reply).await {
            tracing::error!("Failed to deliver reply to chat {}: {}", chat_id.0, e);
        }
    }
    Ok(())
}

/// Send a reply, converting model output to HTML with a plain-text fallback
async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<()> {
    let markup = reply.keyboard.as_ref().map(to_inline_keyboard);

    if reply.format == TextFormat::Markdown {
        let html = markdown_to_telegram_html(&reply.text);
        let mut request = bot.send_message(chat_id, html).parse_mode(ParseMode::Html);
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }
        match request.await {
            Ok(_) => return Ok(()),
            Err(e) => tracing::warn!("HTML parse failed, falling back to plain text: {}", e),
        }
    }

    let mut request = bot.send_message(chat_id, &reply.text);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    request
        .await
        .map_err(|e| ChannelError::ApiError(format!("Failed to send message: {}", e)))?;
    Ok(())
}

async fn edit_reply(bot: &Bot, chat_id: ChatId, message_id: MessageId, reply: &Reply) -> Result<()> {
    let mut request = bot.edit_message_text(chat_id, message_id, &reply.text);
    if let Some(keyboard) = &reply.keyboard {
        request = request.reply_markup(to_inline_keyboard(keyboard));
    }
    request
        .await
        .map_err(|e| ChannelError::ApiError(format!("Failed to edit message: {}", e)))?;
    Ok(())
}

fn to_inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

fn mask_token(text: &str, token: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, "***")
    }
}

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[\w]*\n?([\s\S]*?)```").expect("valid code block regex"));
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"));
static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").expect("valid header regex"));
static QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^>\s*(.*)$").expect("valid quote regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_([^_\n]+)_\b").expect("valid italic regex"));
static STRIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~~(.+?)~~").expect("valid strikethrough regex"));
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[-*]\s+").expect("valid bullet regex"));

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert model Markdown to the HTML subset Telegram accepts
fn markdown_to_telegram_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Code is lifted out first so no other rule touches it
    let mut code_blocks: Vec<String> = Vec::new();
    let result = CODE_BLOCK_RE.replace_all(text, |caps: &regex::Captures| {
        code_blocks.push(caps[1].to_string());
        format!("\x00CB{}\x00", code_blocks.len() - 1)
    });

    let mut inline_codes: Vec<String> = Vec::new();
    let result = INLINE_CODE_RE.replace_all(&result, |caps: &regex::Captures| {
        inline_codes.push(caps[1].to_string());
        format!("\x00IC{}\x00", inline_codes.len() - 1)
    });

    let result = HEADER_RE.replace_all(&result, "$1");
    let result = QUOTE_RE.replace_all(&result, "$1");

    let result = escape_html(&result);

    let result = LINK_RE.replace_all(&result, r#"<a href="$2">$1</a>"#);
    let result = BOLD_RE.replace_all(&result, "<b>$1$2</b>");
    let result = ITALIC_RE.replace_all(&result, "<i>$1</i>");
    let result = STRIKE_RE.replace_all(&result, "<s>$1</s>");
    let mut result = BULLET_RE.replace_all(&result, "• ").into_owned();

    for (i, code) in inline_codes.iter().enumerate() {
        result = result.replace(
            &format!("\x00IC{}\x00", i),
            &format!("<code>{}</code>", escape_html(code)),
        );
    }
    for (i, code) in code_blocks.iter().enumerate() {
        result = result.replace(
            &format!("\x00CB{}\x00", i),
            &format!("<pre><code>{}</code></pre>", escape_html(code)),
        );
    }

    result
}

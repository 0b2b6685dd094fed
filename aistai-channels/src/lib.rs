//! Chat platform integration for aistai

pub mod base;
pub mod telegram;

pub use base::{ChannelError, Result};
pub use telegram::TelegramHandler;

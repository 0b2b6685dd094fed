//! Conversation logic for aistai
//!
//! This crate provides the completion relay, the inline menus and the
//! platform-independent router that the Telegram adapter drives.

pub mod menu;
pub mod relay;
pub mod router;

pub use menu::{Button, CallbackAction, Keyboard};
pub use relay::{Completion, CompletionRelay, RelayError, RelaySettings, FAILURE_NOTICE};
pub use router::{CallbackOutcome, ChatRouter, Reply, TextFormat};

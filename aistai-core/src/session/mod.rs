//! Session management for conversation history
//!
//! Sessions live in memory only; nothing is persisted across restarts.

pub mod manager;
pub mod store;

pub use manager::{SessionHandle, SessionStore, UserId};
pub use store::{Role, Session, Turn};

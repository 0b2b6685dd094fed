//! Core types for aistai
//!
//! Configuration, error types, logging setup, the per-user session store
//! and the model registry shared by every other aistai crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;

pub use error::{Error, Result};
pub use models::{ModelEntry, ModelRegistry};
pub use session::{Role, Session, SessionHandle, SessionStore, Turn, UserId};

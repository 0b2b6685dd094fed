//! Chat completion API clients for aistai
//!
//! This crate provides the provider abstraction and an OpenAI-compatible
//! HTTP implementation.

pub mod base;
pub mod openai;

pub use base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use openai::OpenAIClient;

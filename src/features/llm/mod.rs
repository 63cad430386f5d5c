//! # LLM Feature
//!
//! Language-model completion behind a trait so classification and conversation
//! can be exercised without network access.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod openai_chat;

use anyhow::Result;
use async_trait::async_trait;

pub use openai_chat::OpenAiChat;

/// A single-turn completion: system instruction plus one user message
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, user_text: &str) -> Result<String>;
}

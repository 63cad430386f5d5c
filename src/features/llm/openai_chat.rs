//! OpenAI chat-completion client
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Per-instance temperature so the classifier can run deterministically
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info};
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

use super::LanguageModel;

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            timeout: Duration::from_secs(45),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn message(role: ChatCompletionMessageRole, content: &str) -> ChatCompletionMessage {
        ChatCompletionMessage {
            role,
            content: Some(content.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, system: &str, user_text: &str) -> Result<String> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        info!(
            "[{request_id}] Starting OpenAI request | Model: {} | Temperature: {}",
            self.model, self.temperature
        );
        debug!(
            "[{request_id}] System prompt length: {} chars | User message: '{}'",
            system.len(),
            user_text.chars().take(100).collect::<String>()
        );

        let messages = vec![
            Self::message(ChatCompletionMessageRole::System, system),
            Self::message(ChatCompletionMessageRole::User, user_text),
        ];

        let request = ChatCompletion::builder(&self.model, messages)
            .temperature(self.temperature)
            .create();

        let completion = timeout(self.timeout, request)
            .await
            .map_err(|_| {
                error!(
                    "[{request_id}] OpenAI request timed out after {:?}",
                    start_time.elapsed()
                );
                anyhow::anyhow!("OpenAI request timed out after {:?}", self.timeout)
            })?
            .map_err(|e| {
                error!("[{request_id}] OpenAI API error after {:?}: {e}", start_time.elapsed());
                anyhow::anyhow!("OpenAI API error: {}", e)
            })?;

        info!(
            "[{request_id}] OpenAI response received after {:?}",
            start_time.elapsed()
        );

        completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("OpenAI response contained no content"))
    }
}

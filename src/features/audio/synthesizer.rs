//! # Feature: Speech Synthesis
//!
//! Text-to-speech for reminders and replies. Output formats are tried in
//! order until one succeeds.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Format selection as an ordered strategy list (WAV, then MP3)
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use std::sync::Arc;

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Value for the API's `response_format` field
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl SynthesizedAudio {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }
}

/// One synthesis attempt in a specific format
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, format: AudioFormat) -> Result<Vec<u8>>;
}

/// OpenAI `/audio/speech` backend
#[derive(Clone)]
pub struct OpenAiSpeech {
    client: reqwest::Client,
    openai_api_key: String,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(openai_api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            openai_api_key,
            model,
        }
    }
}

#[async_trait]
impl SpeechBackend for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: &str, format: AudioFormat) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(SPEECH_URL)
            .bearer_auth(&self.openai_api_key)
            .json(&json!({
                "model": self.model,
                "voice": voice,
                "input": text,
                "response_format": format.as_str(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Speech API returned {}: {}", status, body));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Clone)]
pub struct SpeechSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    default_voice: String,
    strategies: Vec<AudioFormat>,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, default_voice: String) -> Self {
        Self {
            backend,
            default_voice,
            strategies: vec![AudioFormat::Wav, AudioFormat::Mp3],
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<AudioFormat>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Synthesize `text`, returning the first format that succeeds
    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<SynthesizedAudio> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow::anyhow!("Nothing to synthesize: text is empty"));
        }
        let voice = voice.unwrap_or(&self.default_voice);

        let mut last_error = anyhow::anyhow!("No synthesis strategies configured");
        for &format in &self.strategies {
            match self.backend.synthesize(text, voice, format).await {
                Ok(bytes) => {
                    info!(
                        "Synthesized {} chars as {} ({} bytes)",
                        text.chars().count(),
                        format.as_str(),
                        bytes.len()
                    );
                    return Ok(SynthesizedAudio { bytes, format });
                }
                Err(e) => {
                    debug!("Speech synthesis as {} failed: {e}", format.as_str());
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

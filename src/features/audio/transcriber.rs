//! # Feature: Audio Transcription
//!
//! Speech-to-text for spoken replies and questions via the OpenAI
//! transcription endpoint.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Multipart upload over reqwest, configurable model and language hint
//! - 1.0.0: Initial release with Whisper API integration

use anyhow::Result;
use log::{error, info};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tokio::fs;

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Formats the transcription endpoint accepts without conversion, with MIME types
const SUPPORTED_FORMATS: &[(&str, &str)] = &[
    (".mp3", "audio/mpeg"),
    (".mp4", "audio/mp4"),
    (".m4a", "audio/mp4"),
    (".wav", "audio/wav"),
    (".webm", "audio/webm"),
    (".mpeg", "audio/mpeg"),
    (".mpga", "audio/mpeg"),
];

#[derive(Clone)]
pub struct AudioTranscriber {
    client: reqwest::Client,
    openai_api_key: String,
    model: String,
}

impl AudioTranscriber {
    pub fn new(openai_api_key: String, model: String) -> Self {
        AudioTranscriber {
            client: reqwest::Client::new(),
            openai_api_key,
            model,
        }
    }

    /// MIME type for a supported file name, `None` if unsupported
    pub fn mime_for(filename: &str) -> Option<&'static str> {
        let lower = filename.to_lowercase();
        SUPPORTED_FORMATS
            .iter()
            .find(|(ext, _)| lower.ends_with(ext))
            .map(|(_, mime)| *mime)
    }

    pub async fn transcribe_file(&self, file_path: &Path, language: Option<&str>) -> Result<String> {
        info!("Transcribing audio file: {}", file_path.display());

        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        if Self::mime_for(&filename).is_none() {
            return Err(anyhow::anyhow!("File is not a supported audio format"));
        }

        let data = fs::read(file_path)
            .await
            .map_err(|e| anyhow::anyhow!("Audio file not readable: {}: {}", file_path.display(), e))?;

        self.transcribe_bytes(data, &filename, language).await
    }

    /// Transcribe in-memory audio; `filename` decides the declared format
    pub async fn transcribe_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        language: Option<&str>,
    ) -> Result<String> {
        let mime = Self::mime_for(filename)
            .ok_or_else(|| anyhow::anyhow!("File is not a supported audio format"))?;

        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let mut form = Form::new().text("model", self.model.clone()).part("file", part);
        if let Some(lang) = language.filter(|l| !l.trim().is_empty()) {
            form = form.text("language", lang.trim().to_string());
        }

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .bearer_auth(&self.openai_api_key)
            .multipart(form)
            .send()
            .await?;

        let json: serde_json::Value = response.json().await?;
        extract_transcript(&json)
    }
}

fn extract_transcript(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json.get("text").and_then(|t| t.as_str()) {
        info!("Transcription successful, length: {} characters", text.len());
        Ok(text.to_string())
    } else if let Some(error) = json.get("error") {
        error!("OpenAI API error: {error}");
        Err(anyhow::anyhow!("OpenAI API error: {}", error))
    } else {
        error!("Unexpected response format: {json}");
        Err(anyhow::anyhow!("Unexpected response format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mime_for_supported_formats() {
        assert_eq!(AudioTranscriber::mime_for("reply.WAV"), Some("audio/wav"));
        assert_eq!(AudioTranscriber::mime_for("nota.m4a"), Some("audio/mp4"));
        assert_eq!(AudioTranscriber::mime_for("voz.mp3"), Some("audio/mpeg"));
        assert_eq!(AudioTranscriber::mime_for("voz.ogg"), None);
        assert_eq!(AudioTranscriber::mime_for("notes.txt"), None);
    }

    #[tokio::test]
    async fn test_unsupported_file_rejected_before_upload() {
        let transcriber = AudioTranscriber::new(String::new(), "gpt-4o-mini-transcribe".to_string());
        let err = transcriber
            .transcribe_file(Path::new("/tmp/does-not-matter.flac"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a supported audio format"));
    }

    #[tokio::test]
    async fn test_missing_file_reported() {
        let transcriber = AudioTranscriber::new(String::new(), "gpt-4o-mini-transcribe".to_string());
        let err = transcriber
            .transcribe_file(Path::new("/nonexistent/dir/reply.wav"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not readable"));
    }

    #[test]
    fn test_extract_transcript() {
        assert_eq!(
            extract_transcript(&json!({"text": "sí, ya me la tomé"})).unwrap(),
            "sí, ya me la tomé"
        );
        assert!(extract_transcript(&json!({"error": {"message": "bad key"}}))
            .unwrap_err()
            .to_string()
            .contains("OpenAI API error"));
        assert!(extract_transcript(&json!({"foo": 1})).is_err());
    }
}

//! Process configuration
//!
//! All environment lookups happen here, once, at startup. Everything downstream
//! receives explicit values through [`Config`] or the per-component configs it
//! derives.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Replaced scattered env lookups with a single explicit config object

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::features::confirmation::ClassifierConfig;
use crate::features::schedule::{DetectorConfig, DEFAULT_TOLERANCE_MINUTES};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_STT_MODEL: &str = "gpt-4o-mini-transcribe";
pub const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_DATABASE_PATH: &str = "care.db";
pub const DEFAULT_USER_ID: i64 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    /// Chat model used for conversation and the classifier fallback
    pub openai_model: String,
    pub stt_model: String,
    pub tts_model: String,
    pub voice: String,
    pub database_path: String,
    pub log_level: String,
    /// User assumed when a command does not name one
    pub default_user_id: i64,
    /// Symmetric due-detection window in minutes
    pub tolerance_minutes: i64,
    /// Local offset from UTC in minutes; `None` means UTC
    pub tz_offset_minutes: Option<i32>,
    pub chat_temperature: f32,
    pub chat_timeout_secs: u64,
    pub classifier_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Config {
            openai_api_key: get("OPENAI_API_KEY", ""),
            openai_model: get("OPENAI_MODEL", DEFAULT_CHAT_MODEL),
            stt_model: get("OPENAI_STT_MODEL", DEFAULT_STT_MODEL),
            tts_model: get("OPENAI_TTS_MODEL", DEFAULT_TTS_MODEL),
            voice: get("OPENAI_VOICE", DEFAULT_VOICE),
            database_path: get("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            log_level: get("LOG_LEVEL", "info"),
            default_user_id: parse_or(&lookup, "DEFAULT_USER_ID", DEFAULT_USER_ID)?,
            tolerance_minutes: parse_or(&lookup, "DUE_TOLERANCE_MIN", DEFAULT_TOLERANCE_MINUTES)?,
            tz_offset_minutes: parse_optional(&lookup, "TZ_OFFSET_MIN")?,
            chat_temperature: parse_or(&lookup, "OPENAI_TEMPERATURE", 0.3)?,
            chat_timeout_secs: parse_or(&lookup, "OPENAI_TIMEOUT_SECS", 45)?,
            classifier_timeout_secs: parse_or(&lookup, "CLASSIFIER_TIMEOUT_SECS", 15)?,
        })
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            default_tolerance_minutes: self.tolerance_minutes,
        }
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            fallback_timeout: Duration::from_secs(self.classifier_timeout_secs),
        }
    }

    pub fn has_openai_key(&self) -> bool {
        !self.openai_api_key.is_empty()
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {raw:?}"))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

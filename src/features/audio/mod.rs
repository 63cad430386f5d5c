//! # Audio Feature
//!
//! Speech-to-text for user replies and text-to-speech for reminders.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod synthesizer;
pub mod transcriber;

pub use synthesizer::{AudioFormat, OpenAiSpeech, SpeechBackend, SpeechSynthesizer, SynthesizedAudio};
pub use transcriber::AudioTranscriber;

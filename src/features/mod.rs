//! # Features
//!
//! One module per feature. Each feature re-exports its public surface here.

pub mod assistant;
pub mod audio;
pub mod confirmation;
pub mod llm;
pub mod reminders;
pub mod schedule;

pub use assistant::{CareAssistant, PatientProfile, ProfileSource};
pub use audio::{AudioFormat, AudioTranscriber, OpenAiSpeech, SpeechSynthesizer};
pub use confirmation::{ConfirmationClassifier, ConfirmationResult, ConfirmationStatus, Intent};
pub use llm::{LanguageModel, OpenAiChat};
pub use reminders::ReminderTextBuilder;
pub use schedule::{DueDetector, DueQuery, DueResult, ScheduleRepository};

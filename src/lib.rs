// Core layer - configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure
pub mod database;

pub use core::Config;
pub use database::Database;

pub use features::{
    // Assistant
    CareAssistant, PatientProfile, ProfileSource,
    // Audio
    AudioFormat, AudioTranscriber, OpenAiSpeech, SpeechSynthesizer,
    // Confirmation
    ConfirmationClassifier, ConfirmationResult, ConfirmationStatus, Intent,
    // LLM
    LanguageModel, OpenAiChat,
    // Reminders
    ReminderTextBuilder,
    // Schedule
    DueDetector, DueQuery, DueResult, ScheduleRepository,
};

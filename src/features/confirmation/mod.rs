//! # Confirmation Feature
//!
//! Interprets the user's reply to a medication reminder.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod classifier;

pub use classifier::{
    classify_keywords, ClassifierConfig, ConfirmationClassifier, ConfirmationResult,
    ConfirmationStatus, Intent,
};

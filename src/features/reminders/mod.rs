//! # Reminders Feature
//!
//! Natural-language reminder text for due medications and appointments.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod text_builder;

pub use text_builder::ReminderTextBuilder;

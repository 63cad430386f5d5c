//! # Assistant Feature
//!
//! Conversational answers grounded in the patient's profile and local time.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true

pub mod profile;
pub mod responder;

pub use profile::{build_system_prompt, PatientProfile, ProfileSource};
pub use responder::CareAssistant;

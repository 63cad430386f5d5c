//! # Core Module
//!
//! Configuration shared by the library and the CLI.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Due-detection, classifier and chat timeouts in `Config`
//! - 1.0.0: Initial creation with config module

pub mod config;

pub use config::Config;

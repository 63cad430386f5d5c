//! # Schedule Feature
//!
//! Medication and appointment schedules, recurrence rules and due detection.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Typed records at the repository boundary, weekday flag array
//! - 1.0.0: Initial release

pub mod detector;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod time_window;

pub use detector::{DetectorConfig, DueDetector};
pub use models::{
    format_date, format_time, format_utc_offset, AppointmentListing, AppointmentSchedule,
    DueAppointment, DueMedication, DueQuery, DueResult, MedicationListing, MedicationSchedule,
    UserId,
};
pub use recurrence::{RecurrenceRule, WeekdayFlags};
pub use repository::{RepositoryError, RepositoryResult, ScheduleRepository};
pub use time_window::{minutes_between, TimeWindow, DEFAULT_TOLERANCE_MINUTES};

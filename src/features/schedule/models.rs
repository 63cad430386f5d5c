//! Schedule records, due-detection queries and results
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Added patient name pass-through and listing views
//! - 1.0.0: Typed records replace raw database rows

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use super::recurrence::{RecurrenceRule, WeekdayFlags};

/// Opaque user identifier
pub type UserId = i64;

/// Canonical `HH:MM` rendering of a wall-clock time
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Canonical `YYYY-MM-DD` rendering of a calendar date
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Render a minute offset as `+HH:MM` / `-HH:MM`
pub fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes >= 0 { '+' } else { '-' };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

/// A recurring medication
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationSchedule {
    pub id: i64,
    /// Display name of the patient the schedule belongs to
    pub patient_name: Option<String>,
    pub name: String,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub rule: RecurrenceRule,
}

/// A single-occurrence appointment
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentSchedule {
    pub id: i64,
    pub title: String,
    pub doctor: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub time_of_day: NaiveTime,
    /// Minutes before the appointment when the reminder should fire
    pub pre_notice_minutes: i64,
    pub active: bool,
}

impl AppointmentSchedule {
    /// Local instant at which the reminder is due, `None` when the pre-notice
    /// pushes it outside the representable range
    pub fn trigger_at(&self) -> Option<NaiveDateTime> {
        let notice = chrono::Duration::try_minutes(self.pre_notice_minutes.max(0))?;
        self.date.and_time(self.time_of_day).checked_sub_signed(notice)
    }
}

/// Per-request due-detection query
#[derive(Debug, Clone)]
pub struct DueQuery {
    pub user_id: UserId,
    /// Query instant in the user's local offset
    pub now: DateTime<FixedOffset>,
    /// Overrides the detector's default tolerance when set
    pub tolerance_minutes: Option<i64>,
}

impl DueQuery {
    pub fn new(user_id: UserId, now: DateTime<FixedOffset>) -> Self {
        Self {
            user_id,
            now,
            tolerance_minutes: None,
        }
    }

    /// Shift a UTC instant by a signed minute offset. `None` keeps UTC.
    pub fn from_utc(user_id: UserId, utc: DateTime<Utc>, offset_minutes: Option<i32>) -> Result<Self> {
        let offset = offset_minutes
            .unwrap_or(0)
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow!("UTC offset out of range: {} minutes", offset_minutes.unwrap_or(0)))?;
        Ok(Self::new(user_id, utc.with_timezone(&offset)))
    }

    pub fn with_tolerance(mut self, minutes: i64) -> Self {
        self.tolerance_minutes = Some(minutes);
        self
    }

    /// Wall-clock time at the user's location
    pub fn local_now(&self) -> NaiveDateTime {
        self.now.naive_local()
    }

    pub fn offset_label(&self) -> String {
        format_utc_offset(self.now.offset().local_minus_utc() / 60)
    }
}

/// A medication due now
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueMedication {
    pub medication_id: i64,
    pub patient_name: Option<String>,
    pub name: String,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    /// Scheduled time, `HH:MM`
    pub time: String,
}

impl From<&MedicationSchedule> for DueMedication {
    fn from(med: &MedicationSchedule) -> Self {
        DueMedication {
            medication_id: med.id,
            patient_name: med.patient_name.clone(),
            name: med.name.clone(),
            dosage: med.dosage.clone(),
            instructions: med.instructions.clone(),
            time: format_time(med.rule.time_of_day),
        }
    }
}

/// An appointment whose reminder is due now
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueAppointment {
    pub id: i64,
    pub title: String,
    pub doctor: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub date: String,
    pub time: String,
    pub pre_notice_minutes: i64,
}

impl From<&AppointmentSchedule> for DueAppointment {
    fn from(appt: &AppointmentSchedule) -> Self {
        DueAppointment {
            id: appt.id,
            title: appt.title.clone(),
            doctor: appt.doctor.clone(),
            location: appt.location.clone(),
            notes: appt.notes.clone(),
            date: format_date(appt.date),
            time: format_time(appt.time_of_day),
            pre_notice_minutes: appt.pre_notice_minutes,
        }
    }
}

/// Items due at the query instant, in repository order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueResult<T> {
    pub user_id: UserId,
    pub now_local: DateTime<FixedOffset>,
    pub tolerance_minutes: i64,
    pub items: Vec<T>,
}

impl<T> DueResult<T> {
    pub fn empty(query: &DueQuery, tolerance_minutes: i64) -> Self {
        Self {
            user_id: query.user_id,
            now_local: query.now,
            tolerance_minutes,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First due item. With several due at once this is simply the first
    /// the repository returned.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }
}

/// Unfiltered medication view for management screens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationListing {
    pub id: i64,
    pub name: String,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub time: String,
    pub days: WeekdayFlags,
    pub active: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl From<&MedicationSchedule> for MedicationListing {
    fn from(med: &MedicationSchedule) -> Self {
        MedicationListing {
            id: med.id,
            name: med.name.clone(),
            dosage: med.dosage.clone(),
            instructions: med.instructions.clone(),
            time: format_time(med.rule.time_of_day),
            days: med.rule.days,
            active: med.rule.active,
            start_date: med.rule.start_date.map(format_date),
            end_date: med.rule.end_date.map(format_date),
        }
    }
}

/// Unfiltered appointment view for management screens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentListing {
    pub id: i64,
    pub title: String,
    pub doctor: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub date: String,
    pub time: String,
    pub pre_notice_minutes: i64,
    pub active: bool,
}

impl From<&AppointmentSchedule> for AppointmentListing {
    fn from(appt: &AppointmentSchedule) -> Self {
        AppointmentListing {
            id: appt.id,
            title: appt.title.clone(),
            doctor: appt.doctor.clone(),
            location: appt.location.clone(),
            notes: appt.notes.clone(),
            date: format_date(appt.date),
            time: format_time(appt.time_of_day),
            pre_notice_minutes: appt.pre_notice_minutes,
            active: appt.active,
        }
    }
}

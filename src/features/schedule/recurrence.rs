//! Weekly recurrence rules for medication schedules
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Day flags stored as a fixed array indexed Monday=0..Sunday=6
//! - 1.0.0: Initial release

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::time_window::{minute_of_day, TimeWindow};

/// Seven independent day flags, Monday=0 through Sunday=6
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayFlags([bool; 7]);

impl WeekdayFlags {
    pub fn new(days: [bool; 7]) -> Self {
        Self(days)
    }

    pub fn every_day() -> Self {
        Self([true; 7])
    }

    pub fn only(day: Weekday) -> Self {
        Self::default().with(day)
    }

    pub fn with(mut self, day: Weekday) -> Self {
        self.0[day.num_days_from_monday() as usize] = true;
        self
    }

    pub fn is_set(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn as_array(&self) -> [bool; 7] {
        self.0
    }
}

/// Activation policy for a recurring item: weekdays, validity range and time of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub days: WeekdayFlags,
    pub active: bool,
    pub time_of_day: NaiveTime,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// Active, every day, no validity range
    pub fn daily(time_of_day: NaiveTime) -> Self {
        Self {
            days: WeekdayFlags::every_day(),
            active: true,
            time_of_day,
            start_date: None,
            end_date: None,
        }
    }

    /// Whether the rule applies at all on `date`
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.active
            && self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
            && self.days.is_set(date.weekday())
    }

    /// Whether the rule fires at the local instant `now`.
    ///
    /// Only minute-of-day is compared once the date passes [`Self::is_active`];
    /// the cycle is daily, so an 08:00 rule matches 08:03 on any allowed day.
    pub fn matches_now(&self, now: NaiveDateTime, window: TimeWindow) -> bool {
        self.is_active(now.date())
            && window.within_minute_of_day(minute_of_day(self.time_of_day), minute_of_day(now.time()))
    }
}

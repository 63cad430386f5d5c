//! Symmetric minute tolerance around a target time
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{NaiveDateTime, NaiveTime, Timelike};

/// Tolerance applied when neither the query nor the config sets one
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 5;

/// Whole minutes between two timestamps.
///
/// Seconds are truncated toward zero before taking the absolute value, so
/// 5m59s counts as 5 minutes in either direction.
pub fn minutes_between(target: NaiveDateTime, reference: NaiveDateTime) -> i64 {
    (target - reference).num_minutes().abs()
}

/// Minute of the day (0..1440) for a wall-clock time, seconds ignored
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Symmetric window of `tolerance_minutes` on each side of a reference point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    tolerance_minutes: i64,
}

impl TimeWindow {
    /// Negative tolerances are clamped to zero (exact-minute match)
    pub fn new(tolerance_minutes: i64) -> Self {
        Self {
            tolerance_minutes: tolerance_minutes.max(0),
        }
    }

    pub fn tolerance_minutes(&self) -> i64 {
        self.tolerance_minutes
    }

    /// True iff `|target - reference| <= tolerance` in whole minutes
    pub fn within(&self, target: NaiveDateTime, reference: NaiveDateTime) -> bool {
        minutes_between(target, reference) <= self.tolerance_minutes
    }

    /// Same check on minute-of-day values. No wrap-around at midnight.
    pub fn within_minute_of_day(&self, target: i64, reference: i64) -> bool {
        (target - reference).abs() <= self.tolerance_minutes
    }
}

//! SQLite-backed schedule and profile store.
//!
//! Raw rows are adapted into typed records here and nowhere else. Rows that
//! cannot be adapted are logged and skipped so one bad entry never hides the
//! rest of a user's schedule.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use log::{info, warn};
use sqlite::{Connection, State, Statement, Value};
use std::sync::{Arc, Mutex};

use crate::features::assistant::{PatientProfile, ProfileSource};
use crate::features::schedule::{
    AppointmentSchedule, MedicationSchedule, RecurrenceRule, RepositoryError, RepositoryResult,
    ScheduleRepository, UserId, WeekdayFlags,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    notes TEXT
);
CREATE TABLE IF NOT EXISTS conditions (
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS medications (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    dosage TEXT,
    instructions TEXT,
    time_of_day TEXT NOT NULL,
    monday INTEGER NOT NULL DEFAULT 1,
    tuesday INTEGER NOT NULL DEFAULT 1,
    wednesday INTEGER NOT NULL DEFAULT 1,
    thursday INTEGER NOT NULL DEFAULT 1,
    friday INTEGER NOT NULL DEFAULT 1,
    saturday INTEGER NOT NULL DEFAULT 1,
    sunday INTEGER NOT NULL DEFAULT 1,
    active INTEGER NOT NULL DEFAULT 1,
    start_date TEXT,
    end_date TEXT
);
CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    doctor TEXT,
    location TEXT,
    notes TEXT,
    date TEXT NOT NULL,
    time_of_day TEXT NOT NULL,
    pre_notice_minutes INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);
";

const MEDICATION_QUERY: &str = "
SELECT m.id, u.name AS patient_name, m.name, m.dosage, m.instructions, m.time_of_day,
       m.monday, m.tuesday, m.wednesday, m.thursday, m.friday, m.saturday, m.sunday,
       m.active, m.start_date, m.end_date
FROM medications m
LEFT JOIN users u ON u.id = m.user_id
WHERE m.user_id = ?
ORDER BY m.id";

const APPOINTMENT_QUERY: &str = "
SELECT id, title, doctor, location, notes, date, time_of_day, pre_notice_minutes, active
FROM appointments
WHERE user_id = ?
ORDER BY id";

/// Day columns, Monday first
const WEEKDAY_COLUMNS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and make sure the tables exist.
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let connection =
            sqlite::open(path).with_context(|| format!("Failed to open database at {path}"))?;
        connection
            .execute(SCHEMA)
            .context("Failed to create database tables")?;
        info!("Database ready at {path}");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| RepositoryError::Unavailable("database lock poisoned".to_string()))?;
        f(&connection)
    }
}

impl ScheduleRepository for Database {
    fn list_medications(&self, user_id: UserId) -> RepositoryResult<Vec<MedicationSchedule>> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(MEDICATION_QUERY)?;
            statement.bind((1, user_id))?;

            let mut medications = Vec::new();
            while let State::Row = statement.next()? {
                match medication_from_row(&statement) {
                    Ok(medication) => medications.push(medication),
                    Err(RepositoryError::MalformedRow { id, reason }) => {
                        warn!("Skipping medication row {id}: {reason}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(medications)
        })
    }

    fn list_appointments(&self, user_id: UserId) -> RepositoryResult<Vec<AppointmentSchedule>> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(APPOINTMENT_QUERY)?;
            statement.bind((1, user_id))?;

            let mut appointments = Vec::new();
            while let State::Row = statement.next()? {
                match appointment_from_row(&statement) {
                    Ok(appointment) => appointments.push(appointment),
                    Err(RepositoryError::MalformedRow { id, reason }) => {
                        warn!("Skipping appointment row {id}: {reason}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(appointments)
        })
    }
}

impl ProfileSource for Database {
    fn load_profile(&self, user_id: UserId) -> Result<Option<PatientProfile>> {
        let profile = self.with_connection(|connection| {
            let mut statement = connection.prepare("SELECT name, age, notes FROM users WHERE id = ?")?;
            statement.bind((1, user_id))?;
            if let State::Done = statement.next()? {
                return Ok(None);
            }
            let mut profile = PatientProfile {
                name: text(statement.read::<Value, _>("name")?),
                age: match statement.read::<Value, _>("age")? {
                    Value::Integer(age) => Some(age),
                    _ => None,
                },
                notes: text(statement.read::<Value, _>("notes")?),
                ..Default::default()
            };

            let mut statement =
                connection.prepare("SELECT name FROM conditions WHERE user_id = ? ORDER BY name")?;
            statement.bind((1, user_id))?;
            while let State::Row = statement.next()? {
                if let Some(condition) = text(statement.read::<Value, _>("name")?) {
                    profile.conditions.push(condition);
                }
            }

            let mut statement =
                connection.prepare("SELECT name, active FROM medications WHERE user_id = ? ORDER BY id")?;
            statement.bind((1, user_id))?;
            while let State::Row = statement.next()? {
                if !flag(&statement.read::<Value, _>("active")?) {
                    continue;
                }
                if let Some(name) = text(statement.read::<Value, _>("name")?) {
                    if !profile.medications.contains(&name) {
                        profile.medications.push(name);
                    }
                }
            }

            Ok(Some(profile))
        })?;
        Ok(profile)
    }
}

fn medication_from_row(statement: &Statement) -> RepositoryResult<MedicationSchedule> {
    let id = statement.read::<i64, _>("id")?;
    let malformed = |reason: &str| RepositoryError::MalformedRow {
        id,
        reason: reason.to_string(),
    };

    let name = text(statement.read::<Value, _>("name")?).ok_or_else(|| malformed("missing name"))?;
    let time_of_day = parse_time(&statement.read::<Value, _>("time_of_day")?)
        .ok_or_else(|| malformed("unreadable time_of_day"))?;

    let mut days = [false; 7];
    for (day, column) in days.iter_mut().zip(WEEKDAY_COLUMNS) {
        *day = flag(&statement.read::<Value, _>(column)?);
    }

    let start_date = parse_date(statement.read::<Value, _>("start_date")?)
        .map_err(|reason| malformed(&format!("start_date: {reason}")))?;
    let end_date = parse_date(statement.read::<Value, _>("end_date")?)
        .map_err(|reason| malformed(&format!("end_date: {reason}")))?;

    Ok(MedicationSchedule {
        id,
        patient_name: text(statement.read::<Value, _>("patient_name")?),
        name,
        dosage: text(statement.read::<Value, _>("dosage")?),
        instructions: text(statement.read::<Value, _>("instructions")?),
        rule: RecurrenceRule {
            days: WeekdayFlags::new(days),
            active: flag(&statement.read::<Value, _>("active")?),
            time_of_day,
            start_date,
            end_date,
        },
    })
}

fn appointment_from_row(statement: &Statement) -> RepositoryResult<AppointmentSchedule> {
    let id = statement.read::<i64, _>("id")?;
    let malformed = |reason: &str| RepositoryError::MalformedRow {
        id,
        reason: reason.to_string(),
    };

    let title =
        text(statement.read::<Value, _>("title")?).ok_or_else(|| malformed("missing title"))?;
    let date = parse_date(statement.read::<Value, _>("date")?)
        .map_err(|reason| malformed(&format!("date: {reason}")))?
        .ok_or_else(|| malformed("missing date"))?;
    let time_of_day = parse_time(&statement.read::<Value, _>("time_of_day")?)
        .ok_or_else(|| malformed("unreadable time_of_day"))?;
    let pre_notice_minutes = match statement.read::<Value, _>("pre_notice_minutes")? {
        Value::Integer(minutes) => minutes,
        Value::Null => 0,
        _ => return Err(malformed("non-numeric pre_notice_minutes")),
    };

    let appointment = AppointmentSchedule {
        id,
        title,
        doctor: text(statement.read::<Value, _>("doctor")?),
        location: text(statement.read::<Value, _>("location")?),
        notes: text(statement.read::<Value, _>("notes")?),
        date,
        time_of_day,
        pre_notice_minutes,
        active: flag(&statement.read::<Value, _>("active")?),
    };
    if appointment.trigger_at().is_none() {
        return Err(malformed("pre_notice_minutes out of range"));
    }
    Ok(appointment)
}

/// Trimmed, non-empty text
fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Binary(_) | Value::Null => None,
    }
}

/// Boolean-like column: non-zero numbers and "1"/"true"/"yes"/"t" are true
fn flag(value: &Value) -> bool {
    match value {
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "t"
        ),
        Value::Binary(_) | Value::Null => false,
    }
}

/// `HH:MM` or `HH:MM:SS` with optional fraction
fn parse_time(value: &Value) -> Option<NaiveTime> {
    let Value::String(raw) = value else {
        return None;
    };
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// `YYYY-MM-DD`; missing or blank is `None`
fn parse_date(value: Value) -> std::result::Result<Option<NaiveDate>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) if raw.trim().is_empty() => Ok(None),
        Value::String(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("unreadable date {raw:?}")),
        other => Err(format!("unexpected value {other:?}")),
    }
}

//! Schedule data source boundary
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use thiserror::Error;

use super::models::{AppointmentSchedule, MedicationSchedule, UserId};

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The store could not be reached or the query failed as a whole
    #[error("Schedule store unavailable: {0}")]
    Unavailable(String),

    /// A single row could not be adapted into a typed record
    #[error("Malformed schedule row {id}: {reason}")]
    MalformedRow { id: i64, reason: String },
}

impl From<sqlite::Error> for RepositoryError {
    fn from(e: sqlite::Error) -> Self {
        RepositoryError::Unavailable(e.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Read-only access to a user's schedules.
///
/// Implementations return an empty list for users without schedules and
/// reserve errors for an unreachable store. Malformed rows are skipped by the
/// implementation, never returned.
pub trait ScheduleRepository: Send + Sync {
    fn list_medications(&self, user_id: UserId) -> RepositoryResult<Vec<MedicationSchedule>>;

    fn list_appointments(&self, user_id: UserId) -> RepositoryResult<Vec<AppointmentSchedule>>;
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory repository keyed by user id
    #[derive(Default)]
    pub struct InMemoryRepository {
        pub medications: HashMap<UserId, Vec<MedicationSchedule>>,
        pub appointments: HashMap<UserId, Vec<AppointmentSchedule>>,
    }

    impl ScheduleRepository for InMemoryRepository {
        fn list_medications(&self, user_id: UserId) -> RepositoryResult<Vec<MedicationSchedule>> {
            Ok(self.medications.get(&user_id).cloned().unwrap_or_default())
        }

        fn list_appointments(&self, user_id: UserId) -> RepositoryResult<Vec<AppointmentSchedule>> {
            Ok(self.appointments.get(&user_id).cloned().unwrap_or_default())
        }
    }

    /// Repository whose store is always down
    #[derive(Default)]
    pub struct UnavailableRepository {
        pub calls: AtomicUsize,
    }

    impl ScheduleRepository for UnavailableRepository {
        fn list_medications(&self, _user_id: UserId) -> RepositoryResult<Vec<MedicationSchedule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }

        fn list_appointments(&self, _user_id: UserId) -> RepositoryResult<Vec<AppointmentSchedule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }
    }
}

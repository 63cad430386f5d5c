//! # Feature: Due Detection
//!
//! Decides which medications and appointments are due at a caller-supplied
//! instant. Medications recur on a daily cycle filtered by weekday and validity
//! range; appointments are single occurrences compared on the full timestamp.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: One detector for both item kinds; weekday filtering moved out of SQL
//! - 1.1.0: Appointment pre-notice support
//! - 1.0.0: Initial release with medication-only matching

use log::{debug, warn};
use std::sync::Arc;

use super::models::{
    AppointmentListing, DueAppointment, DueMedication, DueQuery, DueResult, MedicationListing,
    UserId,
};
use super::repository::{RepositoryResult, ScheduleRepository};
use super::time_window::{TimeWindow, DEFAULT_TOLERANCE_MINUTES};

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Tolerance used when a query does not carry its own
    pub default_tolerance_minutes: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            default_tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
        }
    }
}

#[derive(Clone)]
pub struct DueDetector {
    repository: Arc<dyn ScheduleRepository>,
    config: DetectorConfig,
}

impl DueDetector {
    pub fn new(repository: Arc<dyn ScheduleRepository>, config: DetectorConfig) -> Self {
        Self { repository, config }
    }

    fn window_for(&self, query: &DueQuery) -> TimeWindow {
        TimeWindow::new(
            query
                .tolerance_minutes
                .unwrap_or(self.config.default_tolerance_minutes),
        )
    }

    /// Medications due at `query.now`, in repository order.
    ///
    /// A store failure yields an empty result and a warning; it never reaches
    /// the caller.
    pub fn find_due_medications(&self, query: &DueQuery) -> DueResult<DueMedication> {
        let window = self.window_for(query);
        let mut result = DueResult::empty(query, window.tolerance_minutes());

        let medications = match self.repository.list_medications(query.user_id) {
            Ok(meds) => meds,
            Err(e) => {
                warn!(
                    "Medication lookup failed for user {}; treating as nothing due: {e}",
                    query.user_id
                );
                return result;
            }
        };

        let now = query.local_now();
        result.items = medications
            .iter()
            .filter(|med| med.rule.matches_now(now, window))
            .map(DueMedication::from)
            .collect();

        debug!(
            "User {}: {} of {} medication(s) due at {} (±{} min)",
            query.user_id,
            result.items.len(),
            medications.len(),
            now.format("%Y-%m-%d %H:%M"),
            window.tolerance_minutes()
        );
        result
    }

    /// Appointments whose pre-notice trigger falls within the window around `query.now`
    pub fn find_due_appointments(&self, query: &DueQuery) -> DueResult<DueAppointment> {
        let window = self.window_for(query);
        let mut result = DueResult::empty(query, window.tolerance_minutes());

        let appointments = match self.repository.list_appointments(query.user_id) {
            Ok(appts) => appts,
            Err(e) => {
                warn!(
                    "Appointment lookup failed for user {}; treating as nothing due: {e}",
                    query.user_id
                );
                return result;
            }
        };

        let now = query.local_now();
        result.items = appointments
            .iter()
            .filter(|appt| appt.active)
            .filter(|appt| match appt.trigger_at() {
                Some(trigger) => window.within(trigger, now),
                None => {
                    warn!(
                        "Skipping appointment {}: pre-notice of {} minutes is out of range",
                        appt.id, appt.pre_notice_minutes
                    );
                    false
                }
            })
            .map(DueAppointment::from)
            .collect();

        debug!(
            "User {}: {} of {} appointment(s) due at {}",
            query.user_id,
            result.items.len(),
            appointments.len(),
            now.format("%Y-%m-%d %H:%M")
        );
        result
    }

    /// Every medication for the user, inactive last, then by name and time
    pub fn list_all_medications(&self, user_id: UserId) -> RepositoryResult<Vec<MedicationListing>> {
        let mut meds = self.repository.list_medications(user_id)?;
        meds.sort_by(|a, b| {
            b.rule
                .active
                .cmp(&a.rule.active)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.rule.time_of_day.cmp(&b.rule.time_of_day))
        });
        Ok(meds.iter().map(MedicationListing::from).collect())
    }

    /// Every appointment for the user, inactive last, then chronological
    pub fn list_all_appointments(&self, user_id: UserId) -> RepositoryResult<Vec<AppointmentListing>> {
        let mut appts = self.repository.list_appointments(user_id)?;
        appts.sort_by(|a, b| {
            b.active
                .cmp(&a.active)
                .then_with(|| a.date.cmp(&b.date))
                .then_with(|| a.time_of_day.cmp(&b.time_of_day))
        });
        Ok(appts.iter().map(AppointmentListing::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schedule::models::{AppointmentSchedule, MedicationSchedule};
    use crate::features::schedule::recurrence::{RecurrenceRule, WeekdayFlags};
    use crate::features::schedule::repository::fakes::{InMemoryRepository, UnavailableRepository};
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};
    use std::sync::atomic::Ordering;

    const USER: UserId = 3;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 2025-03-12 is a Wednesday
    fn local(d: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(-4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, d, h, m, 0)
            .unwrap()
    }

    fn med(id: i64, name: &str, rule: RecurrenceRule) -> MedicationSchedule {
        MedicationSchedule {
            id,
            patient_name: Some("Rosa".to_string()),
            name: name.to_string(),
            dosage: Some("1 tableta".to_string()),
            instructions: None,
            rule,
        }
    }

    fn appt(id: i64, date: NaiveDate, at: NaiveTime, pre_notice: i64) -> AppointmentSchedule {
        AppointmentSchedule {
            id,
            title: "Control de presión".to_string(),
            doctor: Some("Dra. Pérez".to_string()),
            location: Some("Consultorio 4".to_string()),
            notes: None,
            date,
            time_of_day: at,
            pre_notice_minutes: pre_notice,
            active: true,
        }
    }

    fn detector_with(meds: Vec<MedicationSchedule>, appts: Vec<AppointmentSchedule>) -> DueDetector {
        let mut repo = InMemoryRepository::default();
        repo.medications.insert(USER, meds);
        repo.appointments.insert(USER, appts);
        DueDetector::new(Arc::new(repo), DetectorConfig::default())
    }

    fn due_med_names(detector: &DueDetector, now: DateTime<FixedOffset>) -> Vec<String> {
        detector
            .find_due_medications(&DueQuery::new(USER, now))
            .items
            .into_iter()
            .map(|m| m.name)
            .collect()
    }

    #[test]
    fn test_medication_window_boundaries() {
        let detector = detector_with(vec![med(1, "Losartán", RecurrenceRule::daily(time(8, 0)))], vec![]);

        assert_eq!(due_med_names(&detector, local(12, 8, 5)), vec!["Losartán"]);
        assert_eq!(due_med_names(&detector, local(12, 7, 55)), vec!["Losartán"]);
        assert!(due_med_names(&detector, local(12, 8, 6)).is_empty());
        assert!(due_med_names(&detector, local(12, 7, 54)).is_empty());
    }

    #[test]
    fn test_due_item_annotation() {
        let detector = detector_with(vec![med(9, "Losartán", RecurrenceRule::daily(time(8, 0)))], vec![]);
        let result = detector.find_due_medications(&DueQuery::new(USER, local(12, 8, 2)));

        let item = result.first().unwrap();
        assert_eq!(item.medication_id, 9);
        assert_eq!(item.time, "08:00");
        assert_eq!(item.dosage.as_deref(), Some("1 tableta"));
        assert_eq!(item.patient_name.as_deref(), Some("Rosa"));
        assert_eq!(result.tolerance_minutes, 5);
        assert_eq!(result.user_id, USER);
    }

    #[test]
    fn test_inactive_medication_never_due() {
        let rule = RecurrenceRule {
            active: false,
            ..RecurrenceRule::daily(time(8, 0))
        };
        let detector = detector_with(vec![med(1, "Losartán", rule)], vec![]);

        for day in 10..=16 {
            for hour in [7, 8, 9] {
                assert!(due_med_names(&detector, local(day, hour, 0)).is_empty());
            }
        }
    }

    #[test]
    fn test_validity_range_uses_local_date() {
        let rule = RecurrenceRule {
            start_date: Some(date(2025, 3, 12)),
            end_date: Some(date(2025, 3, 12)),
            ..RecurrenceRule::daily(time(23, 0))
        };
        let detector = detector_with(vec![med(1, "Melatonina", rule)], vec![]);

        // 23:00 on the 12th at UTC-4 is already the 13th in UTC
        assert_eq!(due_med_names(&detector, local(12, 23, 0)), vec!["Melatonina"]);
        assert!(due_med_names(&detector, local(11, 23, 0)).is_empty());
        assert!(due_med_names(&detector, local(13, 23, 0)).is_empty());
    }

    #[test]
    fn test_wednesday_only_medication() {
        let rule = RecurrenceRule {
            days: WeekdayFlags::only(Weekday::Wed),
            ..RecurrenceRule::daily(time(8, 0))
        };
        let detector = detector_with(vec![med(1, "Vitamina D", rule)], vec![]);
        let wide = |now| {
            detector
                .find_due_medications(&DueQuery::new(USER, now).with_tolerance(24 * 60))
                .items
                .len()
        };

        assert_eq!(wide(local(12, 8, 0)), 1);
        for day in [10, 11, 13, 14, 15, 16] {
            assert_eq!(wide(local(day, 8, 0)), 0, "day {day} should not match");
        }
    }

    #[test]
    fn test_preserves_repository_order() {
        let detector = detector_with(
            vec![
                med(1, "Zinc", RecurrenceRule::daily(time(8, 0))),
                med(2, "Aspirina", RecurrenceRule::daily(time(8, 3))),
                med(3, "Omeprazol", RecurrenceRule::daily(time(12, 0))),
            ],
            vec![],
        );
        assert_eq!(due_med_names(&detector, local(12, 8, 1)), vec!["Zinc", "Aspirina"]);
    }

    #[test]
    fn test_idempotent() {
        let detector = detector_with(vec![med(1, "Losartán", RecurrenceRule::daily(time(8, 0)))], vec![]);
        let query = DueQuery::new(USER, local(12, 8, 0));
        assert_eq!(
            detector.find_due_medications(&query),
            detector.find_due_medications(&query)
        );
    }

    #[test]
    fn test_empty_repository() {
        let detector = DueDetector::new(Arc::new(InMemoryRepository::default()), DetectorConfig::default());
        let query = DueQuery::new(USER, local(12, 8, 0));
        assert!(detector.find_due_medications(&query).is_empty());
        assert!(detector.find_due_appointments(&query).is_empty());
        assert!(detector.list_all_medications(USER).unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_store_degrades_to_empty() {
        let repo = Arc::new(UnavailableRepository::default());
        let detector = DueDetector::new(repo.clone(), DetectorConfig::default());
        let query = DueQuery::new(USER, local(12, 8, 0));

        assert!(detector.find_due_medications(&query).is_empty());
        assert!(detector.find_due_appointments(&query).is_empty());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listing_propagates_store_failure() {
        let detector = DueDetector::new(Arc::new(UnavailableRepository::default()), DetectorConfig::default());
        assert!(detector.list_all_medications(USER).is_err());
        assert!(detector.list_all_appointments(USER).is_err());
    }

    #[test]
    fn test_appointment_pre_notice_window() {
        let detector = detector_with(vec![], vec![appt(5, date(2025, 3, 12), time(14, 0), 30)]);
        let due = |h, m| {
            detector
                .find_due_appointments(&DueQuery::new(USER, local(12, h, m)))
                .items
                .len()
        };

        assert_eq!(due(13, 30), 1);
        assert_eq!(due(13, 25), 1);
        assert_eq!(due(13, 35), 1);
        assert_eq!(due(13, 24), 0);
        assert_eq!(due(13, 36), 0);
        assert_eq!(due(14, 0), 0);
    }

    #[test]
    fn test_out_of_range_pre_notice_skipped() {
        let broken = appt(4, date(2025, 3, 12), time(9, 0), 9_000_000_000_000);
        let detector = detector_with(
            vec![],
            vec![broken, appt(5, date(2025, 3, 12), time(14, 0), 30)],
        );
        let result = detector.find_due_appointments(&DueQuery::new(USER, local(12, 13, 30)));
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, 5);
    }

    #[test]
    fn test_appointment_does_not_recur() {
        let detector = detector_with(vec![], vec![appt(5, date(2025, 3, 12), time(14, 0), 0)]);
        let next_day = detector.find_due_appointments(&DueQuery::new(USER, local(13, 14, 0)));
        assert!(next_day.is_empty());
    }

    #[test]
    fn test_appointment_payload() {
        let detector = detector_with(vec![], vec![appt(5, date(2025, 3, 12), time(14, 0), 30)]);
        let result = detector.find_due_appointments(&DueQuery::new(USER, local(12, 13, 30)));
        let item = result.first().unwrap();

        assert_eq!(item.id, 5);
        assert_eq!(item.date, "2025-03-12");
        assert_eq!(item.time, "14:00");
        assert_eq!(item.pre_notice_minutes, 30);
        assert_eq!(item.doctor.as_deref(), Some("Dra. Pérez"));
    }

    #[test]
    fn test_inactive_appointment_skipped() {
        let mut cancelled = appt(5, date(2025, 3, 12), time(14, 0), 0);
        cancelled.active = false;
        let detector = detector_with(vec![], vec![cancelled]);
        assert!(detector
            .find_due_appointments(&DueQuery::new(USER, local(12, 14, 0)))
            .is_empty());
    }

    #[test]
    fn test_query_tolerance_overrides_default() {
        let detector = detector_with(vec![med(1, "Losartán", RecurrenceRule::daily(time(8, 0)))], vec![]);
        let narrow = DueQuery::new(USER, local(12, 8, 3)).with_tolerance(2);
        let wide = DueQuery::new(USER, local(12, 8, 3)).with_tolerance(10);

        assert!(detector.find_due_medications(&narrow).is_empty());
        assert_eq!(detector.find_due_medications(&wide).tolerance_minutes, 10);
        assert_eq!(detector.find_due_medications(&wide).items.len(), 1);
    }

    #[test]
    fn test_list_all_medications_ordering() {
        let inactive = RecurrenceRule {
            active: false,
            ..RecurrenceRule::daily(time(6, 0))
        };
        let detector = detector_with(
            vec![
                med(1, "aspirina", inactive),
                med(2, "Losartán", RecurrenceRule::daily(time(20, 0))),
                med(3, "Losartán", RecurrenceRule::daily(time(8, 0))),
                med(4, "Calcio", RecurrenceRule::daily(time(12, 0))),
            ],
            vec![],
        );

        let ids: Vec<i64> = detector
            .list_all_medications(USER)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_list_all_appointments_ordering() {
        let mut old = appt(1, date(2025, 1, 1), time(9, 0), 0);
        old.active = false;
        let detector = detector_with(
            vec![],
            vec![
                old,
                appt(2, date(2025, 4, 1), time(9, 0), 0),
                appt(3, date(2025, 3, 20), time(15, 0), 0),
                appt(4, date(2025, 3, 20), time(10, 0), 0),
            ],
        );

        let ids: Vec<i64> = detector
            .list_all_appointments(USER)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }
}

//! Spoken reminder text
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Appointment reminders
//! - 1.0.0: Medication reminders with optional confirmation prompt

use crate::features::schedule::{DueAppointment, DueMedication};

const CONFIRMATION_PROMPT: &str = " ¿Ya te la tomaste? Responde sí o no.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReminderKind {
    Medication { dosage: Option<String> },
    Appointment { doctor: Option<String>, location: Option<String> },
}

/// Builder for a single-sentence reminder.
///
/// # Example
///
/// ```ignore
/// let text = ReminderTextBuilder::medication("Losartán", "08:00")
///     .with_name(Some("Rosa"))
///     .with_dosage(Some("50 mg"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReminderTextBuilder {
    name: Option<String>,
    label: String,
    time: String,
    kind: ReminderKind,
    ask_confirmation: bool,
}

impl ReminderTextBuilder {
    /// Medication reminder; asks for confirmation by default
    pub fn medication(label: &str, time: &str) -> Self {
        Self {
            name: None,
            label: label.to_string(),
            time: time.to_string(),
            kind: ReminderKind::Medication { dosage: None },
            ask_confirmation: true,
        }
    }

    /// Appointment reminder; no confirmation prompt by default
    pub fn appointment(title: &str, time: &str) -> Self {
        Self {
            name: None,
            label: title.to_string(),
            time: time.to_string(),
            kind: ReminderKind::Appointment {
                doctor: None,
                location: None,
            },
            ask_confirmation: false,
        }
    }

    pub fn for_due_medication(item: &DueMedication) -> Self {
        Self::medication(&item.name, &item.time)
            .with_name(item.patient_name.as_deref())
            .with_dosage(item.dosage.as_deref())
    }

    pub fn for_due_appointment(item: &DueAppointment) -> Self {
        let mut builder = Self::appointment(&item.title, &item.time);
        builder.kind = ReminderKind::Appointment {
            doctor: non_blank(item.doctor.as_deref()),
            location: non_blank(item.location.as_deref()),
        };
        builder
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = non_blank(name);
        self
    }

    /// Ignored for appointments
    pub fn with_dosage(mut self, dosage: Option<&str>) -> Self {
        if let ReminderKind::Medication { dosage: ref mut d } = self.kind {
            *d = non_blank(dosage);
        }
        self
    }

    pub fn ask_confirmation(mut self, ask: bool) -> Self {
        self.ask_confirmation = ask;
        self
    }

    pub fn build(self) -> String {
        let greeting = match &self.name {
            Some(name) => format!("Hola {name}, "),
            None => "Hola, ".to_string(),
        };

        let mut text = match &self.kind {
            ReminderKind::Medication { dosage } => {
                let dosage = dosage
                    .as_deref()
                    .map(|d| format!(" {d}"))
                    .unwrap_or_default();
                format!(
                    "{greeting}es la hora de tomar {}{dosage}. Son las {}. Por favor tómala con cuidado.",
                    self.label, self.time
                )
            }
            ReminderKind::Appointment { doctor, location } => {
                let mut sentence = format!("{greeting}tienes tu cita de {}", self.label);
                if let Some(doctor) = doctor {
                    sentence.push_str(&format!(" con {doctor}"));
                }
                if let Some(location) = location {
                    sentence.push_str(&format!(" en {location}"));
                }
                sentence.push_str(&format!(" a las {}.", self.time));
                sentence
            }
        };

        if self.ask_confirmation {
            text.push_str(CONFIRMATION_PROMPT);
        }
        text
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

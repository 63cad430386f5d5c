//! Patient profile and the system prompt built from it

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::features::schedule::{format_utc_offset, UserId};

const NO_PROFILE: &str = "Sin datos de usuario.";

const ASSISTANT_GUIDELINES: &str = "Eres un asistente conversacional para adultos mayores.
- Habla SIEMPRE en español, claro y pausado.
- Usa oraciones cortas, estructura simple y tono amable.
- Ofrece confirmar entendimiento y repetir si hace falta.
- Cuando des pasos o instrucciones, enumera con viñetas o pasos.
- Si hay dudas médicas, da información general y sugiere consultar a un profesional.
- Evita tecnicismos innecesarios; explica conceptos de forma sencilla.

Responde SIEMPRE en función del siguiente perfil del usuario:";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientProfile {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub notes: Option<String>,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
}

impl PatientProfile {
    /// One `Label: value` line per known field
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        if let Some(name) = &self.name {
            lines.push(format!("Nombre: {name}"));
        }
        if let Some(age) = self.age {
            lines.push(format!("Edad: {age}"));
        }
        if !self.conditions.is_empty() {
            lines.push(format!("Condiciones médicas: {}", self.conditions.join(", ")));
        }
        if !self.medications.is_empty() {
            lines.push(format!("Medicamentos: {}", self.medications.join(", ")));
        }
        if let Some(notes) = &self.notes {
            lines.push(format!("Observaciones: {notes}"));
        }

        if lines.is_empty() {
            NO_PROFILE.to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Where user profiles come from
pub trait ProfileSource: Send + Sync {
    /// `Ok(None)` when the user is unknown
    fn load_profile(&self, user_id: UserId) -> Result<Option<PatientProfile>>;
}

/// System prompt with guidelines, profile and the current local time.
///
/// Without an offset the local time is UTC.
pub fn build_system_prompt(
    profile: Option<&PatientProfile>,
    now_utc: DateTime<Utc>,
    offset_minutes: Option<i32>,
) -> String {
    let profile_text = profile
        .map(PatientProfile::to_text)
        .unwrap_or_else(|| NO_PROFILE.to_string());

    let offset = offset_minutes.unwrap_or(0);
    let offset_label = format_utc_offset(offset);
    let now_local = now_utc + Duration::minutes(i64::from(offset));

    format!(
        "{ASSISTANT_GUIDELINES}\n\nPERFIL DEL USUARIO\n{profile_text}\n\n\
         CONTEXTO DE TIEMPO (usar esto al responder):\n\
         - NOW_LOCAL: {} (UTC{offset_label})\n\
         - NOW_UTC:   {} (UTC+00:00)\n\
         Si el usuario pregunta por FECHA u HORA actuales, responde con NOW_LOCAL.\n\
         Si hay ambigüedad, aclara la zona como (UTC{offset_label}).\n",
        now_local.format("%Y-%m-%d %H:%M:%S"),
        now_utc.format("%Y-%m-%d %H:%M:%S"),
    )
}

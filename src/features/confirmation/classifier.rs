//! # Feature: Confirmation Classifier
//!
//! Turns a free-form reply to a medication reminder into taken / missed /
//! unclear. A keyword pass answers the common cases synchronously; only
//! ambiguous replies go to the language model, and any failure there degrades
//! to "unsure" instead of an error.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Fallback call bounded by a timeout; timeouts count as ordinary failures
//! - 1.1.0: Tolerate code fences and prose around the model's JSON reply
//! - 1.0.0: Initial release with keyword pass and model fallback

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::timeout;

use crate::features::llm::LanguageModel;

/// Confidence reported for keyword matches
pub const KEYWORD_CONFIDENCE: f64 = 0.9;

/// Result reported when the model fallback fails for any reason
pub const FALLBACK_CONFIDENCE: f64 = 0.33;

/// Confidence assumed when the model omits one
const MISSING_CONFIDENCE: f64 = 0.5;

/// Affirmative phrases, matched by substring containment
const AFFIRMATIVE_PHRASES: &[&str] = &[
    "sí", "si", "ya", "claro", "por supuesto", "listo", "hecho", "me la tomé", "me la tome",
    "ya la tomé", "ya la tome", "ya lo hice", "la tomé", "la tome",
];

/// Negative phrases, checked only when no affirmative phrase matched.
///
/// Affirmative matching runs first, so a reply such as "no la tomé" (which
/// contains "la tomé") resolves to yes. Negatives only decide replies with no
/// affirmative substring at all.
const NEGATIVE_PHRASES: &[&str] = &[
    "no", "todavía no", "aún no", "aun no", "después", "luego", "más tarde", "mas tarde",
    "no la tomé", "no la tome", "no lo hice",
];

const CLASSIFIER_INSTRUCTION: &str = "Eres un clasificador muy estricto. \
    Decide si la respuesta indica que el usuario YA se tomó el medicamento (yes), \
    NO se lo ha tomado (no), o no es claro (unsure). \
    Responde SOLO un JSON como {\"intent\":\"yes|no|unsure\",\"confidence\":0-1}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Yes,
    No,
    Unsure,
}

impl Intent {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "yes" => Some(Intent::Yes),
            "no" => Some(Intent::No),
            "unsure" => Some(Intent::Unsure),
            _ => None,
        }
    }

    pub fn status(self) -> ConfirmationStatus {
        match self {
            Intent::Yes => ConfirmationStatus::Taken,
            Intent::No => ConfirmationStatus::Missed,
            Intent::Unsure => ConfirmationStatus::Unclear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Taken,
    Missed,
    Unclear,
}

impl ConfirmationStatus {
    /// Spoken acknowledgement for this outcome
    pub fn reply(self) -> &'static str {
        match self {
            ConfirmationStatus::Taken => {
                "Perfecto. He registrado que tomaste tu medicamento. ¡Bien hecho!"
            }
            ConfirmationStatus::Missed => {
                "De acuerdo. Te recordaré más tarde. Por favor, no lo olvides."
            }
            ConfirmationStatus::Unclear => "No te escuché bien. ¿La tomaste? Responde sí o no.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfirmationResult {
    pub intent: Intent,
    /// `None` when there was nothing to classify
    pub confidence: Option<f64>,
    pub status: ConfirmationStatus,
}

impl ConfirmationResult {
    fn new(intent: Intent, confidence: Option<f64>) -> Self {
        Self {
            intent,
            confidence,
            status: intent.status(),
        }
    }

    fn fallback() -> Self {
        Self::new(Intent::Unsure, Some(FALLBACK_CONFIDENCE))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Upper bound on the model fallback call
    pub fallback_timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fallback_timeout: Duration::from_secs(15),
        }
    }
}

/// Keyword pass. `None` means neither phrase set matched.
pub fn classify_keywords(text: &str) -> Option<Intent> {
    let normalized = text.trim().to_lowercase();
    if AFFIRMATIVE_PHRASES.iter().any(|p| normalized.contains(p)) {
        Some(Intent::Yes)
    } else if NEGATIVE_PHRASES.iter().any(|p| normalized.contains(p)) {
        Some(Intent::No)
    } else {
        None
    }
}

fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
}

/// Parse the model's `{intent, confidence}` reply.
///
/// Unknown intents become `Unsure`; a missing confidence becomes 0.5; numeric
/// strings are accepted. Returns `None` when no usable JSON object is present.
fn parse_model_reply(reply: &str) -> Option<(Intent, f64)> {
    let json = json_object_pattern().find(reply)?.as_str();
    let verdict: ModelVerdict = serde_json::from_str(json).ok()?;

    let intent = verdict
        .intent
        .as_deref()
        .and_then(Intent::parse)
        .unwrap_or(Intent::Unsure);

    let confidence = match verdict.confidence {
        None | Some(serde_json::Value::Null) => MISSING_CONFIDENCE,
        Some(serde_json::Value::Number(n)) => n.as_f64()?,
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok()?,
        Some(_) => return None,
    };
    if !confidence.is_finite() {
        return None;
    }

    Some((intent, confidence.clamp(0.0, 1.0)))
}

#[derive(Clone)]
pub struct ConfirmationClassifier {
    model: Arc<dyn LanguageModel>,
    config: ClassifierConfig,
}

impl ConfirmationClassifier {
    pub fn new(model: Arc<dyn LanguageModel>, config: ClassifierConfig) -> Self {
        Self { model, config }
    }

    /// Classify a reply. Never fails.
    pub async fn classify(&self, text: &str) -> ConfirmationResult {
        if text.trim().is_empty() {
            return ConfirmationResult::new(Intent::Unsure, None);
        }

        if let Some(intent) = classify_keywords(text) {
            debug!("Keyword pass classified reply as {intent:?}");
            return ConfirmationResult::new(intent, Some(KEYWORD_CONFIDENCE));
        }

        self.classify_with_model(text).await
    }

    async fn classify_with_model(&self, text: &str) -> ConfirmationResult {
        let user_text = format!("Respuesta del usuario: {text}");
        let call = self.model.complete(CLASSIFIER_INSTRUCTION, &user_text);

        let reply = match timeout(self.config.fallback_timeout, call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Classifier fallback failed: {e}");
                return ConfirmationResult::fallback();
            }
            Err(_) => {
                warn!(
                    "Classifier fallback timed out after {:?}",
                    self.config.fallback_timeout
                );
                return ConfirmationResult::fallback();
            }
        };

        match parse_model_reply(&reply) {
            Some((intent, confidence)) => {
                debug!("Model classified reply as {intent:?} ({confidence:.2})");
                ConfirmationResult::new(intent, Some(confidence))
            }
            None => {
                warn!(
                    "Unparseable classifier reply: '{}'",
                    reply.chars().take(200).collect::<String>()
                );
                ConfirmationResult::fallback()
            }
        }
    }
}

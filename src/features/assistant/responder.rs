use anyhow::Result;
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

use super::profile::{build_system_prompt, ProfileSource};
use crate::features::llm::LanguageModel;
use crate::features::schedule::UserId;

/// Answers free-form questions in the context of a patient's profile
#[derive(Clone)]
pub struct CareAssistant {
    profiles: Arc<dyn ProfileSource>,
    model: Arc<dyn LanguageModel>,
    tz_offset_minutes: Option<i32>,
}

impl CareAssistant {
    pub fn new(profiles: Arc<dyn ProfileSource>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            profiles,
            model,
            tz_offset_minutes: None,
        }
    }

    pub fn with_tz_offset(mut self, minutes: Option<i32>) -> Self {
        self.tz_offset_minutes = minutes;
        self
    }

    /// Profile lookup and completion errors are returned to the caller.
    pub async fn answer(&self, user_id: UserId, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(anyhow::anyhow!("Message is empty"));
        }

        let profile = self.profiles.load_profile(user_id)?;
        if profile.is_none() {
            debug!("No profile for user {user_id}, answering without one");
        }
        let system = build_system_prompt(profile.as_ref(), Utc::now(), self.tz_offset_minutes);

        let reply = self.model.complete(&system, message).await?;
        info!("Answered user {} ({} chars)", user_id, reply.chars().count());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::assistant::PatientProfile;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedProfiles(Option<PatientProfile>);

    impl ProfileSource for FixedProfiles {
        fn load_profile(&self, _user_id: UserId) -> Result<Option<PatientProfile>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenProfiles;

    impl ProfileSource for BrokenProfiles {
        fn load_profile(&self, _user_id: UserId) -> Result<Option<PatientProfile>> {
            Err(anyhow::anyhow!("database is locked"))
        }
    }

    /// Records the prompts it receives
    #[derive(Default)]
    struct EchoModel {
        seen: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, system: &str, user_text: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user_text.to_string()));
            if self.fail {
                return Err(anyhow::anyhow!("Chat completion timed out after 45s"));
            }
            Ok(format!("respuesta a: {user_text}"))
        }
    }

    #[tokio::test]
    async fn test_answer_includes_profile() {
        let model = Arc::new(EchoModel::default());
        let profile = PatientProfile {
            name: Some("Rosa".to_string()),
            ..Default::default()
        };
        let assistant = CareAssistant::new(Arc::new(FixedProfiles(Some(profile))), model.clone())
            .with_tz_offset(Some(-240));

        let reply = assistant.answer(3, "  ¿Qué día es hoy? ").await.unwrap();
        assert_eq!(reply, "respuesta a: ¿Qué día es hoy?");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("Nombre: Rosa"));
        assert!(seen[0].0.contains("(UTC-04:00)"));
    }

    #[tokio::test]
    async fn test_unknown_user_still_answered() {
        let model = Arc::new(EchoModel::default());
        let assistant = CareAssistant::new(Arc::new(FixedProfiles(None)), model.clone());

        assert!(assistant.answer(99, "hola").await.is_ok());
        assert!(model.seen.lock().unwrap()[0].0.contains("Sin datos de usuario."));
    }

    #[tokio::test]
    async fn test_profile_error_propagates() {
        let model = Arc::new(EchoModel::default());
        let assistant = CareAssistant::new(Arc::new(BrokenProfiles), model.clone());

        let err = assistant.answer(3, "hola").await.unwrap_err();
        assert!(err.to_string().contains("locked"));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(EchoModel {
            fail: true,
            ..Default::default()
        });
        let assistant = CareAssistant::new(Arc::new(FixedProfiles(None)), model);

        assert!(assistant.answer(3, "hola").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let model = Arc::new(EchoModel::default());
        let assistant = CareAssistant::new(Arc::new(FixedProfiles(None)), model.clone());

        assert!(assistant.answer(3, "   ").await.is_err());
        assert!(model.seen.lock().unwrap().is_empty());
    }
}

//! Coaching features built on the domain records: free chat, roadmap,
//! habits, push mode, mindset, marketing, sales reviews, hiring docs.
//!
//! Every generated feature reads the user's records, templates them into a
//! prompt, and makes one gateway call.

pub mod chat;
pub mod habits;
pub mod hiring;
pub mod marketing;
pub mod mindset;
pub mod prompts;
pub mod pushmode;
pub mod roadmap;
pub mod sales;

pub use hiring::HiringMode;
pub use prompts::{CoachContext, FaithMode};

use std::sync::Arc;

use crate::error::{CoachingError, StoreError};
use crate::llm::LlmProvider;
use crate::memory::UserMemory;

/// Runtime settings stored under `config:{key}`.
pub mod settings_keys {
    pub const GLOBAL_TONE: &str = "global_tone";
    pub const FAITH_MODE: &str = "faith_mode";

    pub const ALL: &[&str] = &[GLOBAL_TONE, FAITH_MODE];
}

/// Values used when no `config:{key}` override is stored.
#[derive(Debug, Clone, Default)]
pub struct CoachDefaults {
    pub global_tone: Option<String>,
    pub faith_mode: FaithMode,
}

/// Entry point for the coaching features.
#[derive(Clone)]
pub struct Coach {
    memory: UserMemory,
    llm: Arc<dyn LlmProvider>,
    defaults: CoachDefaults,
}

impl Coach {
    pub fn new(memory: UserMemory, llm: Arc<dyn LlmProvider>, defaults: CoachDefaults) -> Self {
        Self {
            memory,
            llm,
            defaults,
        }
    }

    pub fn memory(&self) -> &UserMemory {
        &self.memory
    }

    pub(crate) fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Admin tone override, falling back to the configured default.
    pub async fn global_tone(&self) -> Result<Option<String>, StoreError> {
        match self.memory.config(settings_keys::GLOBAL_TONE).await? {
            Some(serde_json::Value::String(tone)) if !tone.trim().is_empty() => Ok(Some(tone)),
            Some(serde_json::Value::Null) | None => Ok(self.defaults.global_tone.clone()),
            Some(other) => {
                tracing::warn!(value = %other, "Ignoring non-string global_tone");
                Ok(self.defaults.global_tone.clone())
            }
        }
    }

    pub async fn faith_mode(&self) -> Result<FaithMode, StoreError> {
        match self.memory.config(settings_keys::FAITH_MODE).await? {
            Some(serde_json::Value::String(mode)) => match mode.parse() {
                Ok(mode) => Ok(mode),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring invalid faith_mode");
                    Ok(self.defaults.faith_mode)
                }
            },
            _ => Ok(self.defaults.faith_mode),
        }
    }

    /// The coaching system instruction for a user.
    pub async fn system_prompt(&self, user_id: &str) -> Result<String, CoachingError> {
        let profile = self.memory.profile(user_id).await?;
        let roadmap = self.memory.roadmap(user_id).await?;
        let pushmode = self.memory.pushmode(user_id).await?;
        let offer = self.memory.offer(user_id).await?;
        let global_tone = self.global_tone().await?;
        let faith_mode = self.faith_mode().await?;

        Ok(prompts::coaching_system_prompt(&CoachContext {
            profile: profile.as_ref(),
            roadmap: roadmap.as_ref(),
            pushmode: pushmode.as_ref(),
            offer: offer.as_ref(),
            global_tone: global_tone.as_deref(),
            faith_mode,
        }))
    }
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::memory::Profile;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn config_overrides_defaults() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        assert_eq!(coach.global_tone().await.unwrap(), None);
        assert_eq!(coach.faith_mode().await.unwrap(), FaithMode::User);

        let memory = coach.memory();
        memory
            .set_config(settings_keys::GLOBAL_TONE, &serde_json::json!("warm"))
            .await
            .unwrap();
        memory
            .set_config(settings_keys::FAITH_MODE, &serde_json::json!("off"))
            .await
            .unwrap();
        assert_eq!(coach.global_tone().await.unwrap().as_deref(), Some("warm"));
        assert_eq!(coach.faith_mode().await.unwrap(), FaithMode::Off);
    }

    #[tokio::test]
    async fn invalid_faith_mode_falls_back() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        coach
            .memory()
            .set_config(settings_keys::FAITH_MODE, &serde_json::json!("sometimes"))
            .await
            .unwrap();
        assert_eq!(coach.faith_mode().await.unwrap(), FaithMode::User);
    }

    #[tokio::test]
    async fn system_prompt_reads_profile() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        let profile = Profile {
            niche: "law firms".into(),
            ..Default::default()
        };
        coach.memory().set_profile("U1", &profile).await.unwrap();
        let prompt = coach.system_prompt("U1").await.unwrap();
        assert!(prompt.contains("Niche: law firms"));
    }
}

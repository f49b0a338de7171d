//! Mindset coaching. Each message also leaves a trace in `MindsetState`.

use chrono::Utc;

use crate::error::CoachingError;
use crate::memory::MindsetState;

use super::prompts::{MINDSET_MAX_TOKENS, mindset_prompt};
use super::{Coach, truncate_chars};

const MINDSET_SYSTEM: &str = "You are a business mindset coach (not a therapist).";
const THEME_CHARS: usize = 100;
const NOTE_CHARS: usize = 200;
/// Newest themes and note lines kept per user.
pub const MINDSET_THEMES_KEEP: usize = 50;
pub const MINDSET_NOTES_KEEP: usize = 50;

impl Coach {
    pub async fn mindset(&self, user_id: &str, message: &str) -> Result<String, CoachingError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(CoachingError::InvalidInput("tell me what's on your mind".into()));
        }

        let profile = self.memory().profile(user_id).await?;
        let faith = self.faith_mode().await?.effective(profile.as_ref());

        let reply = self
            .llm()
            .generate(
                MINDSET_SYSTEM,
                &mindset_prompt(message, profile.as_ref(), faith),
                MINDSET_MAX_TOKENS,
            )
            .await?;

        let now = Utc::now();
        let mut state = self
            .memory()
            .mindset(user_id)
            .await?
            .unwrap_or_else(|| MindsetState {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        state
            .themes
            .push(truncate_chars(message, THEME_CHARS).to_string());
        state.notes.push_str(&format!(
            "\n{} - {}",
            now.to_rfc3339(),
            truncate_chars(message, NOTE_CHARS)
        ));
        cap_trace(&mut state);
        state.last_updated = now;
        self.memory().set_mindset(user_id, &state).await?;

        Ok(reply)
    }
}

fn cap_trace(state: &mut MindsetState) {
    let excess = state.themes.len().saturating_sub(MINDSET_THEMES_KEEP);
    state.themes.drain(..excess);

    let lines: Vec<&str> = state.notes.lines().filter(|l| !l.is_empty()).collect();
    if lines.len() > MINDSET_NOTES_KEEP {
        let kept: String = lines[lines.len() - MINDSET_NOTES_KEEP..]
            .iter()
            .map(|l| format!("\n{l}"))
            .collect();
        state.notes = kept;
    }
}

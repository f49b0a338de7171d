//! Free-form coaching chat, used when no wizard is active.

use crate::error::CoachingError;
use crate::memory::{HistoryEntry, HistoryRole};

use super::Coach;
use super::prompts::CHAT_MAX_TOKENS;

/// Turns of history included in the prompt.
const CONTEXT_TURNS: usize = 10;

fn render_history(history: &[HistoryEntry]) -> String {
    history
        .iter()
        .map(|entry| {
            let who = match entry.role {
                HistoryRole::User => "User",
                HistoryRole::Assistant => "Coach",
            };
            format!("{who}: {}", entry.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Coach {
    /// Generate a reply without touching stored history.
    pub async fn preview_reply(&self, user_id: &str, message: &str) -> Result<String, CoachingError> {
        let system = self.system_prompt(user_id).await?;
        let history = self.memory().recent_history(user_id, CONTEXT_TURNS).await?;

        let prompt = if history.is_empty() {
            message.to_string()
        } else {
            format!(
                "Recent conversation:\n{}\n\nUser: {message}",
                render_history(&history)
            )
        };

        Ok(self.llm().generate(&system, &prompt, CHAT_MAX_TOKENS).await?)
    }

    /// Reply to a message and append both turns to the user's history.
    pub async fn chat(&self, user_id: &str, message: &str) -> Result<String, CoachingError> {
        let reply = self.preview_reply(user_id, message).await?;
        self.memory()
            .append_history(user_id, HistoryRole::User, message)
            .await?;
        self.memory()
            .append_history(user_id, HistoryRole::Assistant, &reply)
            .await?;
        Ok(reply)
    }
}

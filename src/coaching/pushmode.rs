//! Accountability intensity.

use chrono::Utc;

use crate::error::CoachingError;
use crate::memory::{PushLevel, PushModeState};

use super::Coach;

impl Coach {
    pub async fn set_pushmode(
        &self,
        user_id: &str,
        enabled: bool,
        level: PushLevel,
    ) -> Result<PushModeState, CoachingError> {
        let state = PushModeState {
            enabled,
            level,
            last_updated: Utc::now(),
        };
        self.memory().set_pushmode(user_id, &state).await?;
        tracing::info!(user_id, enabled, %level, "Push mode updated");
        Ok(state)
    }

    /// Flip `enabled`, keeping the level.
    pub async fn toggle_pushmode(&self, user_id: &str) -> Result<PushModeState, CoachingError> {
        let current = self.memory().pushmode(user_id).await?.unwrap_or_default();
        self.set_pushmode(user_id, !current.enabled, current.level)
            .await
    }
}

//! `admin_actions`: run a coaching feature on a user's behalf.

use serde_json::json;

use crate::error::AdminError;

use super::Admin;

/// Asset kind used when the admin does not name one.
pub const DEFAULT_MARKETING_KIND: &str = "content ideas";

impl Admin {
    /// Generate marketing assets from the target user's profile, roadmap
    /// and offer. Logged only when generation succeeds.
    pub async fn run_marketing(
        &self,
        actor: &str,
        user_id: &str,
        kind: Option<&str>,
    ) -> Result<String, AdminError> {
        let kind = kind
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_MARKETING_KIND);
        let assets = self.coach.marketing_assets(user_id, kind, None).await?;
        self.log
            .record(
                actor,
                Some(user_id),
                "actions.run_marketing",
                Some(json!({ "kind": kind, "chars": assets.chars().count() })),
            )
            .await?;
        Ok(assets)
    }
}

//! `admin_state`: reset, profile edits, push mode, stage changes.

use chrono::Utc;
use serde_json::json;

use crate::error::AdminError;
use crate::memory::{Profile, PushModeState, Roadmap};

use super::Admin;

impl Admin {
    /// Delete every `user:{id}:*` key.
    pub async fn reset_user(&self, actor: &str, user_id: &str) -> Result<usize, AdminError> {
        let deleted = self.memory().reset(user_id).await?;
        self.log
            .record(actor, Some(user_id), "state.reset", Some(json!({ "deleted": deleted })))
            .await?;
        Ok(deleted)
    }

    /// Overwrite one profile field. A missing profile starts from defaults.
    pub async fn profile_set(
        &self,
        actor: &str,
        user_id: &str,
        field: &str,
        value: &str,
    ) -> Result<Profile, AdminError> {
        let mut profile = self
            .memory()
            .profile(user_id)
            .await?
            .unwrap_or_else(|| {
                let now = Utc::now();
                Profile {
                    user_id: user_id.to_string(),
                    created_at: now,
                    updated_at: now,
                    ..Default::default()
                }
            });

        let before = serde_json::to_value(&profile).ok().and_then(|v| v.get(field).cloned());
        if !profile.set_field(field, value) {
            return Err(AdminError::UnknownField(field.to_string()));
        }
        let after = serde_json::to_value(&profile).ok().and_then(|v| v.get(field).cloned());

        self.memory().set_profile(user_id, &profile).await?;
        self.log
            .record(
                actor,
                Some(user_id),
                "state.profile_set",
                Some(json!({ "field": field, "before": before, "after": after })),
            )
            .await?;
        Ok(profile)
    }

    pub async fn toggle_pushmode(
        &self,
        actor: &str,
        user_id: &str,
    ) -> Result<PushModeState, AdminError> {
        let state = self.coach.toggle_pushmode(user_id).await?;
        self.log
            .record(
                actor,
                Some(user_id),
                "state.pushmode",
                Some(json!({ "enabled": state.enabled, "level": state.level })),
            )
            .await?;
        Ok(state)
    }

    pub async fn set_stage(
        &self,
        actor: &str,
        user_id: &str,
        stage_id: &str,
    ) -> Result<Roadmap, AdminError> {
        let previous = self
            .memory()
            .roadmap(user_id)
            .await?
            .map(|r| r.current_stage_id);
        let roadmap = self.coach.set_stage(user_id, stage_id).await?;
        self.log
            .record(
                actor,
                Some(user_id),
                "state.set_stage",
                Some(json!({ "before": previous, "after": stage_id })),
            )
            .await?;
        Ok(roadmap)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::error::CoachingError;
    use crate::memory::{RoadmapStage, StageStatus};

    #[tokio::test]
    async fn reset_clears_user_and_logs() {
        let admin = admin();
        admin
            .memory()
            .set_profile("U1", &Profile::default())
            .await
            .unwrap();
        assert_eq!(admin.reset_user("root", "U1").await.unwrap(), 1);
        assert!(admin.memory().profile("U1").await.unwrap().is_none());

        let logs = admin.log().recent(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "state.reset");
        assert_eq!(logs[0].target_user_id.as_deref(), Some("U1"));
        assert_eq!(logs[0].diff.as_ref().unwrap()["deleted"], 1);
    }

    #[tokio::test]
    async fn profile_set_records_before_and_after() {
        let admin = admin();
        let profile = admin
            .profile_set("root", "U1", "niche", "plumbers")
            .await
            .unwrap();
        assert_eq!(profile.niche, "plumbers");
        assert_eq!(profile.user_id, "U1");

        let logs = admin.log().recent(1).await.unwrap();
        let diff = logs[0].diff.clone().unwrap();
        assert_eq!(diff["before"], "");
        assert_eq!(diff["after"], "plumbers");
    }

    #[tokio::test]
    async fn profile_set_rejects_unknown_field_without_logging() {
        let admin = admin();
        let err = admin
            .profile_set("root", "U1", "isAdmin", "true")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::UnknownField(ref f) if f == "isAdmin"));
        assert!(admin.log().recent(10).await.unwrap().is_empty());
        assert!(admin.memory().profile("U1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn toggle_pushmode_flips() {
        let admin = admin();
        assert!(admin.toggle_pushmode("root", "U1").await.unwrap().enabled);
        assert!(!admin.toggle_pushmode("root", "U1").await.unwrap().enabled);
        assert_eq!(admin.log().recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_stage_requires_roadmap_and_stage() {
        let admin = admin();
        let err = admin.set_stage("root", "U1", "stage-2").await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Coaching(CoachingError::Missing { .. })
        ));

        let mut roadmap = Roadmap {
            stages: vec![
                RoadmapStage {
                    id: "stage-1".into(),
                    ..Default::default()
                },
                RoadmapStage {
                    id: "stage-2".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        roadmap.normalize();
        admin.memory().set_roadmap("U1", &roadmap).await.unwrap();

        let updated = admin.set_stage("root", "U1", "stage-2").await.unwrap();
        assert_eq!(updated.stages[1].status, StageStatus::Active);
        let logs = admin.log().recent(1).await.unwrap();
        assert_eq!(logs[0].diff.as_ref().unwrap()["before"], "stage-1");
    }
}

//! Roadmap navigation: view, move between stages, tick off tasks.

use crate::error::CoachingError;
use crate::memory::Roadmap;

use super::Coach;

impl Coach {
    pub async fn roadmap(&self, user_id: &str) -> Result<Roadmap, CoachingError> {
        self.memory()
            .roadmap(user_id)
            .await?
            .ok_or(CoachingError::Missing { record: "roadmap" })
    }

    /// Activate `stage_id`; the previously active stage is marked completed.
    pub async fn set_stage(&self, user_id: &str, stage_id: &str) -> Result<Roadmap, CoachingError> {
        let mut roadmap = self.roadmap(user_id).await?;
        if !roadmap.set_stage(stage_id) {
            return Err(CoachingError::NotFound {
                entity: "stage",
                id: stage_id.to_string(),
            });
        }
        self.memory().set_roadmap(user_id, &roadmap).await?;
        tracing::info!(user_id, stage_id, "Roadmap stage changed");
        Ok(roadmap)
    }

    pub async fn complete_task(
        &self,
        user_id: &str,
        stage_id: &str,
        task: &str,
    ) -> Result<Roadmap, CoachingError> {
        let mut roadmap = self.roadmap(user_id).await?;
        match roadmap.complete_task(stage_id, task) {
            None => Err(CoachingError::NotFound {
                entity: "stage",
                id: stage_id.to_string(),
            }),
            Some(false) => Err(CoachingError::NotFound {
                entity: "task",
                id: task.to_string(),
            }),
            Some(true) => {
                self.memory().set_roadmap(user_id, &roadmap).await?;
                Ok(roadmap)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::memory::{RoadmapStage, StageStatus};

    async fn coach_with_roadmap() -> Coach {
        let coach = coach_with(RecordingLlm::replying("ok"));
        let mut roadmap = Roadmap {
            stages: (1..=3)
                .map(|i| RoadmapStage {
                    id: format!("stage-{i}"),
                    tasks: vec!["write script".into()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        roadmap.normalize();
        coach.memory().set_roadmap("U1", &roadmap).await.unwrap();
        coach
    }

    #[tokio::test]
    async fn missing_roadmap_is_reported() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        assert!(matches!(
            coach.roadmap("U1").await,
            Err(CoachingError::Missing { record: "roadmap" })
        ));
    }

    #[tokio::test]
    async fn set_stage_persists() {
        let coach = coach_with_roadmap().await;
        coach.set_stage("U1", "stage-2").await.unwrap();
        let stored = coach.roadmap("U1").await.unwrap();
        assert_eq!(stored.current_stage_id, "stage-2");
        assert_eq!(stored.stages[0].status, StageStatus::Completed);
        assert_eq!(stored.stages[1].status, StageStatus::Active);
    }

    #[tokio::test]
    async fn set_unknown_stage_is_not_found() {
        let coach = coach_with_roadmap().await;
        let err = coach.set_stage("U1", "stage-7").await.unwrap_err();
        assert!(matches!(err, CoachingError::NotFound { entity: "stage", .. }));
    }

    #[tokio::test]
    async fn complete_task_persists() {
        let coach = coach_with_roadmap().await;
        coach.complete_task("U1", "stage-1", "write script").await.unwrap();
        assert!(coach.roadmap("U1").await.unwrap().stages[0].tasks.is_empty());

        let err = coach
            .complete_task("U1", "stage-1", "write script")
            .await
            .unwrap_err();
        assert!(matches!(err, CoachingError::NotFound { entity: "task", .. }));
    }
}

//! Habit tracking. Completions are one set member per day, so marking a
//! habit done twice on the same day counts once.

use std::str::FromStr;

use chrono::Utc;

use crate::error::CoachingError;
use crate::memory::{Habit, HabitFrequency, Habits};

use super::Coach;

/// Validate a custom schedule. Five-field crontab expressions are accepted
/// and get a leading seconds field.
pub fn normalize_cron(expr: &str) -> Result<String, CoachingError> {
    let expr = expr.trim();
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    cron::Schedule::from_str(&normalized)
        .map_err(|e| CoachingError::InvalidInput(format!("invalid cron expression: {e}")))?;
    Ok(normalized)
}

/// Completion count for one habit.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitStat {
    pub habit: Habit,
    pub completions: usize,
}

impl Coach {
    pub async fn add_habit(
        &self,
        user_id: &str,
        description: &str,
        frequency: HabitFrequency,
        custom_cron: Option<&str>,
    ) -> Result<Habit, CoachingError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(CoachingError::InvalidInput(
                "habit description is empty".into(),
            ));
        }

        let custom_cron = match (frequency, custom_cron) {
            (HabitFrequency::Custom, Some(expr)) => Some(normalize_cron(expr)?),
            (HabitFrequency::Custom, None) => {
                return Err(CoachingError::InvalidInput(
                    "custom habits need a cron schedule".into(),
                ));
            }
            _ => None,
        };

        let now = Utc::now();
        let habit = Habit {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
            frequency,
            custom_cron,
            created_at: now,
            updated_at: now,
        };

        let mut habits = self.memory().habits(user_id).await?.unwrap_or_else(|| Habits {
            user_id: user_id.to_string(),
            habits: Vec::new(),
        });
        habits.habits.push(habit.clone());
        self.memory().set_habits(user_id, &habits).await?;

        tracing::info!(user_id, habit_id = %habit.id, %frequency, "Habit added");
        Ok(habit)
    }

    pub async fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>, CoachingError> {
        Ok(self
            .memory()
            .habits(user_id)
            .await?
            .map(|h| h.habits)
            .unwrap_or_default())
    }

    /// Mark a habit done for today. Returns `false` if it already was.
    pub async fn complete_habit(&self, user_id: &str, habit_id: &str) -> Result<bool, CoachingError> {
        let known = self
            .list_habits(user_id)
            .await?
            .iter()
            .any(|h| h.id == habit_id);
        if !known {
            return Err(CoachingError::NotFound {
                entity: "habit",
                id: habit_id.to_string(),
            });
        }
        let today = Utc::now().date_naive();
        Ok(self
            .memory()
            .log_habit_completion(user_id, habit_id, today)
            .await?)
    }

    pub async fn habit_stats(&self, user_id: &str) -> Result<Vec<HabitStat>, CoachingError> {
        let mut stats = Vec::new();
        for habit in self.list_habits(user_id).await? {
            let completions = self
                .memory()
                .habit_completion_count(user_id, &habit.id)
                .await?;
            stats.push(HabitStat { habit, completions });
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn cron_accepts_five_and_six_fields() {
        assert_eq!(normalize_cron("30 7 * * Mon").unwrap(), "0 30 7 * * Mon");
        assert_eq!(normalize_cron("0 0 9 * * *").unwrap(), "0 0 9 * * *");
        assert!(normalize_cron("every morning").is_err());
    }

    #[tokio::test]
    async fn add_and_list() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        let habit = coach
            .add_habit("U1", " 10 outreach DMs ", HabitFrequency::Daily, None)
            .await
            .unwrap();
        assert_eq!(habit.description, "10 outreach DMs");
        assert!(habit.custom_cron.is_none());

        let habits = coach.list_habits("U1").await.unwrap();
        assert_eq!(habits, vec![habit]);
    }

    #[tokio::test]
    async fn custom_habits_need_valid_cron() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        assert!(matches!(
            coach.add_habit("U1", "review", HabitFrequency::Custom, None).await,
            Err(CoachingError::InvalidInput(_))
        ));
        assert!(matches!(
            coach
                .add_habit("U1", "review", HabitFrequency::Custom, Some("nope"))
                .await,
            Err(CoachingError::InvalidInput(_))
        ));
        let habit = coach
            .add_habit("U1", "review", HabitFrequency::Custom, Some("0 17 * * Fri"))
            .await
            .unwrap();
        assert_eq!(habit.custom_cron.as_deref(), Some("0 0 17 * * Fri"));
    }

    #[tokio::test]
    async fn completion_counts_once_per_day() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        let habit = coach
            .add_habit("U1", "publish a post", HabitFrequency::Daily, None)
            .await
            .unwrap();

        assert!(coach.complete_habit("U1", &habit.id).await.unwrap());
        assert!(!coach.complete_habit("U1", &habit.id).await.unwrap());

        let stats = coach.habit_stats("U1").await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].completions, 1);
    }

    #[tokio::test]
    async fn completing_unknown_habit_fails() {
        let coach = coach_with(RecordingLlm::replying("ok"));
        assert!(matches!(
            coach.complete_habit("U1", "missing").await,
            Err(CoachingError::NotFound { entity: "habit", .. })
        ));
    }
}

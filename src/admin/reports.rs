//! `admin_reports`: read-only scans over user keys.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AdminError;
use crate::store::keys;
use crate::wizard::FlowType;

use super::Admin;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementReport {
    pub users_tracking_habits: usize,
    pub user_ids: Vec<String>,
    pub total_habits: usize,
    pub total_completions: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub users_with_roadmaps: usize,
    /// Users per current stage id.
    pub by_stage: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardProgress {
    pub user_id: String,
    pub flow: FlowType,
    pub step: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardReport {
    pub in_progress: Vec<WizardProgress>,
}

/// Distinct owners of keys matching `pattern`, sorted.
fn owners(keys_found: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = keys_found
        .iter()
        .filter_map(|k| keys::user_id_of(k))
        .map(String::from)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

impl Admin {
    pub async fn engagement_report(&self) -> Result<EngagementReport, AdminError> {
        let store = self.memory().store();
        let user_ids = owners(&store.scan_keys("user:*:habits").await?);

        let mut total_habits = 0;
        for user_id in &user_ids {
            total_habits += self
                .memory()
                .habits(user_id)
                .await?
                .map(|h| h.habits.len())
                .unwrap_or(0);
        }

        let mut total_completions = 0;
        for key in store.scan_keys("user:*:habit_logs:*").await? {
            total_completions += store.set_card(&key).await?;
        }

        Ok(EngagementReport {
            users_tracking_habits: user_ids.len(),
            user_ids,
            total_habits,
            total_completions,
        })
    }

    pub async fn stage_report(&self) -> Result<StageReport, AdminError> {
        let user_ids = owners(&self.memory().store().scan_keys("user:*:roadmap").await?);
        let mut by_stage = BTreeMap::new();
        for user_id in &user_ids {
            if let Some(roadmap) = self.memory().roadmap(user_id).await? {
                *by_stage.entry(roadmap.current_stage_id).or_insert(0) += 1;
            }
        }
        Ok(StageReport {
            users_with_roadmaps: user_ids.len(),
            by_stage,
        })
    }

    /// Wizards that were started and not yet finalized or cancelled.
    pub async fn wizard_report(&self) -> Result<WizardReport, AdminError> {
        let mut in_progress = Vec::new();
        for flow in FlowType::ALL {
            let pattern = flow.state_key("*");
            for user_id in owners(&self.memory().store().scan_keys(&pattern).await?) {
                if let Some(state) = self.wizard.load(&user_id, flow).await? {
                    in_progress.push(WizardProgress {
                        user_id,
                        flow,
                        step: state.step_index,
                        total: state.total_steps(),
                    });
                }
            }
        }
        Ok(WizardReport { in_progress })
    }
}

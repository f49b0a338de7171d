//! Typed domain records owned by a single user.
//!
//! Every record deserializes leniently: missing fields fall back to their
//! defaults so records written by older deployments still load.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much faith language the coach may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaithPreference {
    #[default]
    Off,
    Light,
    Strong,
}

impl FaithPreference {
    /// `light` and `strong` are recognised; anything else is `off`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "strong" => Self::Strong,
            _ => Self::Off,
        }
    }
}

impl std::fmt::Display for FaithPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Light => write!(f, "light"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

/// Business profile built from the intake answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub business_name: String,
    pub niche: String,
    pub current_revenue: String,
    pub offer_description: String,
    pub primary_goals: String,
    pub lead_sources: String,
    pub sales_process: String,
    pub team_size: String,
    pub tech_stack: String,
    pub bottlenecks: Vec<String>,
    /// Severity per business area, as produced by the intake diagnosis.
    pub bottleneck_map: BTreeMap<String, String>,
    pub faith_preference: FaithPreference,
    pub tone_preference: String,
    pub communication_style: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fields an administrator may overwrite with `profile_set`.
    pub const EDITABLE_FIELDS: &'static [&'static str] = &[
        "username",
        "timezone",
        "businessName",
        "niche",
        "currentRevenue",
        "offerDescription",
        "primaryGoals",
        "leadSources",
        "salesProcess",
        "teamSize",
        "techStack",
        "bottlenecks",
        "faithPreference",
        "tonePreference",
        "communicationStyle",
    ];

    /// Overwrite one named field from free text. Returns `false` for unknown
    /// field names.
    pub fn set_field(&mut self, field: &str, value: &str) -> bool {
        let value = value.trim();
        match field {
            "username" => self.username = value.to_string(),
            "timezone" => {
                self.timezone = (!value.is_empty()).then(|| value.to_string());
            }
            "businessName" => self.business_name = value.to_string(),
            "niche" => self.niche = value.to_string(),
            "currentRevenue" => self.current_revenue = value.to_string(),
            "offerDescription" => self.offer_description = value.to_string(),
            "primaryGoals" => self.primary_goals = value.to_string(),
            "leadSources" => self.lead_sources = value.to_string(),
            "salesProcess" => self.sales_process = value.to_string(),
            "teamSize" => self.team_size = value.to_string(),
            "techStack" => self.tech_stack = value.to_string(),
            "bottlenecks" => self.bottlenecks = split_list(value),
            "faithPreference" => self.faith_preference = FaithPreference::parse_lenient(value),
            "tonePreference" => self.tone_preference = value.to_string(),
            "communicationStyle" => self.communication_style = value.to_string(),
            _ => return false,
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Split a comma separated answer into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Locked,
    Active,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoadmapStage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub objectives: Vec<String>,
    pub tasks: Vec<String>,
    pub habits: Vec<String>,
    pub kpis: Vec<String>,
    pub status: StageStatus,
}

/// Ordered stages with exactly one `active` stage, the one named by
/// `current_stage_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Roadmap {
    pub user_id: String,
    pub current_stage_id: String,
    pub stages: Vec<RoadmapStage>,
    pub last_updated: DateTime<Utc>,
}

impl Roadmap {
    pub fn stage(&self, stage_id: &str) -> Option<&RoadmapStage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn current_stage(&self) -> Option<&RoadmapStage> {
        self.stage(&self.current_stage_id)
    }

    /// Repair a generated roadmap so the single-active invariant holds.
    ///
    /// An unknown or empty `current_stage_id` falls back to the first stage.
    /// Any other `active` stage is demoted to `locked`, as is a later stage
    /// repeating the current id. Returns `false` when
    /// there are no stages at all.
    pub fn normalize(&mut self) -> bool {
        let Some(first) = self.stages.first() else {
            return false;
        };
        if self.stage(&self.current_stage_id).is_none() {
            self.current_stage_id = first.id.clone();
        }
        let current = self.current_stage_id.clone();
        self.activate(&current, StageStatus::Locked);
        true
    }

    /// Mark the first stage with `stage_id` active. Every other active stage,
    /// including later stages that repeat the id, gets `demoted_to`.
    fn activate(&mut self, stage_id: &str, demoted_to: StageStatus) {
        let mut activated = false;
        for stage in &mut self.stages {
            if !activated && stage.id == stage_id {
                stage.status = StageStatus::Active;
                activated = true;
            } else if stage.status == StageStatus::Active {
                stage.status = demoted_to;
            }
        }
    }

    /// Make `stage_id` the active stage. The previously active stage becomes
    /// `completed`. Returns `false` if the stage does not exist.
    pub fn set_stage(&mut self, stage_id: &str) -> bool {
        if self.stage(stage_id).is_none() {
            return false;
        }
        self.activate(stage_id, StageStatus::Completed);
        self.current_stage_id = stage_id.to_string();
        self.last_updated = Utc::now();
        true
    }

    /// Remove a task from a stage. `None` if the stage does not exist,
    /// otherwise whether the task was found.
    pub fn complete_task(&mut self, stage_id: &str, task: &str) -> Option<bool> {
        let stage = self.stages.iter_mut().find(|s| s.id == stage_id)?;
        let before = stage.tasks.len();
        stage.tasks.retain(|t| t != task);
        let removed = stage.tasks.len() != before;
        if removed {
            self.last_updated = Utc::now();
        }
        Some(removed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Offer {
    pub user_id: String,
    pub offer_name: String,
    pub avatar: String,
    pub problem: String,
    pub promise: String,
    pub price_point: String,
    pub unique_mechanism: String,
    pub program_structure: String,
    pub guarantees: String,
    pub backend_systems: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
    Custom,
}

impl std::str::FromStr for HabitFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown frequency '{other}' (daily, weekly, custom)")),
        }
    }
}

impl std::fmt::Display for HabitFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Habit {
    pub id: String,
    pub description: String,
    pub frequency: HabitFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_cron: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Habits {
    pub user_id: String,
    pub habits: Vec<Habit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushLevel {
    #[default]
    Normal,
    Strong,
    Extreme,
}

impl std::str::FromStr for PushLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "strong" => Ok(Self::Strong),
            "extreme" => Ok(Self::Extreme),
            other => Err(format!("unknown level '{other}' (normal, strong, extreme)")),
        }
    }
}

impl std::fmt::Display for PushLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Strong => write!(f, "strong"),
            Self::Extreme => write!(f, "extreme"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushModeState {
    pub enabled: bool,
    pub level: PushLevel,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MindsetState {
    pub user_id: String,
    pub themes: Vec<String>,
    pub notes: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One chat turn in `user:{id}:history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReview {
    pub ts: DateTime<Utc>,
    pub transcript_snippet: String,
    pub feedback: String,
}

/// Append-only audit entry for a mutating admin command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogRecord {
    pub id: String,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

//! Wizard state: which flow, how far along, and the answers so far.
//!
//! Lifecycle: Absent → InProgress(0..N-1) → AwaitingFinalization(N) → Absent.
//! Absent is simply "no key in the store"; there is no persisted failed state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::keys;

use super::flows::{FlowDefinition, INTAKE, OFFER_BUILDER, Question};

/// The two wizard flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Intake,
    OfferBuilder,
}

impl FlowType {
    /// Dispatch order when looking for an active flow.
    pub const ALL: [FlowType; 2] = [FlowType::Intake, FlowType::OfferBuilder];

    pub fn definition(&self) -> &'static FlowDefinition {
        match self {
            Self::Intake => &INTAKE,
            Self::OfferBuilder => &OFFER_BUILDER,
        }
    }

    /// Store key holding this flow's state for a user.
    pub fn state_key(&self, user_id: &str) -> String {
        match self {
            Self::Intake => keys::intake_state(user_id),
            Self::OfferBuilder => keys::offer_state(user_id),
        }
    }
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::OfferBuilder => write!(f, "offer_builder"),
        }
    }
}

impl std::str::FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intake" => Ok(Self::Intake),
            "offer" | "offer_builder" => Ok(Self::OfferBuilder),
            other => Err(format!("unknown flow '{other}'")),
        }
    }
}

/// Where a persisted wizard sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardPhase {
    InProgress { step: usize },
    AwaitingFinalization,
}

/// In-memory view of one user's wizard for one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub flow: FlowType,
    /// Always within `0..=questions.len()`.
    pub step_index: usize,
    pub answers: BTreeMap<String, String>,
}

/// Persisted shape. The flow is implied by the key it lives under.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWizard {
    #[serde(default)]
    step_index: usize,
    #[serde(default)]
    answers: BTreeMap<String, String>,
}

impl WizardState {
    pub fn new(flow: FlowType) -> Self {
        Self {
            flow,
            step_index: 0,
            answers: BTreeMap::new(),
        }
    }

    pub fn total_steps(&self) -> usize {
        self.flow.definition().len()
    }

    pub fn current_question(&self) -> Option<&'static Question> {
        self.flow.definition().question(self.step_index)
    }

    /// Every question answered; finalization has not yet succeeded.
    pub fn is_complete(&self) -> bool {
        self.step_index >= self.total_steps()
    }

    pub fn phase(&self) -> WizardPhase {
        if self.is_complete() {
            WizardPhase::AwaitingFinalization
        } else {
            WizardPhase::InProgress {
                step: self.step_index,
            }
        }
    }

    /// Store `answer` under the current question and advance one step.
    /// Returns the question answered, or `None` if the flow was already
    /// complete.
    pub fn record_answer(&mut self, answer: &str) -> Option<&'static Question> {
        let question = self.current_question()?;
        self.answers
            .insert(question.key.to_string(), answer.trim().to_string());
        self.step_index += 1;
        Some(question)
    }

    pub fn answer(&self, key: &str) -> &str {
        self.answers.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        let stored = StoredWizard {
            step_index: self.step_index,
            answers: self.answers.clone(),
        };
        serde_json::to_string(&stored)
            .map_err(|e| StoreError::Serialization(format!("{} wizard state: {e}", self.flow)))
    }

    /// Parse a persisted state. An out-of-range step index is clamped to
    /// "awaiting finalization".
    pub fn decode(flow: FlowType, raw: &str) -> Result<Self, serde_json::Error> {
        let stored: StoredWizard = serde_json::from_str(raw)?;
        let total = flow.definition().len();
        Ok(Self {
            flow,
            step_index: stored.step_index.min(total),
            answers: stored.answers,
        })
    }
}

//! Finalization: turn a completed wizard into domain records.
//!
//! Clear-on-success: the wizard state is deleted only after the primary
//! record (profile or offer) is durably written. A generation or store
//! failure before that point leaves the state in `AwaitingFinalization`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::FinalizeError;
use crate::llm::LlmProvider;
use crate::memory::{FaithPreference, Offer, Profile, Roadmap, UserMemory, split_list};

use super::engine::WizardEngine;
use super::prompts::{
    self, BOTTLENECK_MARKER, DIAGNOSIS_MAX_TOKENS, DIAGNOSIS_SYSTEM, OFFER_MARKER,
    OFFER_MAX_TOKENS, OFFER_SYSTEM, ROADMAP_MAX_TOKENS, ROADMAP_SYSTEM,
};
use super::state::{FlowType, WizardState};

/// What a finished intake produced.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub profile: Profile,
    /// `None` when roadmap generation or parsing failed.
    pub roadmap: Option<Roadmap>,
    /// Diagnosis prose to show the user.
    pub diagnosis: String,
}

#[derive(Debug, Clone)]
pub struct OfferOutcome {
    pub offer: Offer,
    pub summary: String,
}

pub struct Finalizer {
    engine: WizardEngine,
    memory: UserMemory,
    llm: Arc<dyn LlmProvider>,
}

impl Finalizer {
    pub fn new(engine: WizardEngine, memory: UserMemory, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            engine,
            memory,
            llm,
        }
    }

    async fn load_completed(
        &self,
        user_id: &str,
        flow: FlowType,
    ) -> Result<WizardState, FinalizeError> {
        match self.engine.load(user_id, flow).await? {
            Some(state) if state.is_complete() => Ok(state),
            _ => Err(FinalizeError::NoActiveFlow { flow }),
        }
    }

    /// Diagnose the business, persist the profile, then try for a roadmap.
    pub async fn finalize_intake(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<IntakeOutcome, FinalizeError> {
        let state = self.load_completed(user_id, FlowType::Intake).await?;

        let response = self
            .llm
            .generate(
                DIAGNOSIS_SYSTEM,
                &prompts::intake_diagnosis_prompt(&state.answers),
                DIAGNOSIS_MAX_TOKENS,
            )
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, error = %e, "Intake diagnosis generation failed");
            })?;

        let marked = prompts::extract_marked_json(&response, BOTTLENECK_MARKER);
        if !marked.parsed {
            tracing::warn!(
                user_id,
                marker_found = marked.marker_found,
                "Diagnosis had no usable bottleneck map, continuing with an empty one"
            );
        }

        let existing = self.memory.profile(user_id).await?;
        let profile = build_profile(user_id, username, &state, &marked.payload, existing);
        self.memory.set_profile(user_id, &profile).await?;

        let roadmap = self
            .generate_roadmap(user_id, &profile, &marked.payload, state.answer("goals"))
            .await;

        self.engine.clear(user_id, FlowType::Intake).await?;
        tracing::info!(
            user_id,
            roadmap = roadmap.is_some(),
            "Intake finalized"
        );

        Ok(IntakeOutcome {
            profile,
            roadmap,
            diagnosis: marked.prose,
        })
    }

    /// Second phase of intake. Any failure here only costs the roadmap.
    async fn generate_roadmap(
        &self,
        user_id: &str,
        profile: &Profile,
        bottleneck_map: &Map<String, Value>,
        goals: &str,
    ) -> Option<Roadmap> {
        let response = match self
            .llm
            .generate(
                ROADMAP_SYSTEM,
                &prompts::roadmap_prompt(profile, bottleneck_map, goals),
                ROADMAP_MAX_TOKENS,
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Roadmap generation failed, skipping roadmap");
                return None;
            }
        };

        let Some(roadmap) = parse_roadmap(user_id, &response) else {
            tracing::warn!(user_id, "Roadmap output was not a usable roadmap, skipping");
            return None;
        };

        match self.memory.set_roadmap(user_id, &roadmap).await {
            Ok(()) => Some(roadmap),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to persist roadmap");
                None
            }
        }
    }

    /// Synthesize the offer and persist it.
    pub async fn finalize_offer(&self, user_id: &str) -> Result<OfferOutcome, FinalizeError> {
        let state = self.load_completed(user_id, FlowType::OfferBuilder).await?;

        let response = self
            .llm
            .generate(
                OFFER_SYSTEM,
                &prompts::offer_builder_prompt(&state.answers),
                OFFER_MAX_TOKENS,
            )
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, error = %e, "Offer generation failed");
            })?;

        let marked = prompts::extract_marked_json(&response, OFFER_MARKER);
        if !marked.parsed {
            tracing::warn!(
                user_id,
                marker_found = marked.marker_found,
                "Offer output had no usable JSON block, saving empty offer fields"
            );
        }

        let offer = build_offer(user_id, &marked.payload);
        self.memory.set_offer(user_id, &offer).await?;
        self.engine.clear(user_id, FlowType::OfferBuilder).await?;
        tracing::info!(user_id, offer_name = %offer.offer_name, "Offer finalized");

        Ok(OfferOutcome {
            offer,
            summary: marked.prose,
        })
    }
}

/// Map intake answers onto the profile. Unknown answer keys are ignored.
pub fn build_profile(
    user_id: &str,
    username: &str,
    state: &WizardState,
    bottleneck_map: &Map<String, Value>,
    existing: Option<Profile>,
) -> Profile {
    let now = Utc::now();
    let created_at = existing.as_ref().map(|p| p.created_at).unwrap_or(now);
    let timezone = existing.and_then(|p| p.timezone);

    Profile {
        user_id: user_id.to_string(),
        username: username.to_string(),
        timezone,
        business_name: format!("{username}'s business"),
        niche: state.answer("niche").to_string(),
        current_revenue: state.answer("currentRevenue").to_string(),
        offer_description: state.answer("offer").to_string(),
        primary_goals: state.answer("goals").to_string(),
        lead_sources: state.answer("leadSources").to_string(),
        sales_process: state.answer("salesProcess").to_string(),
        team_size: state.answer("teamSize").to_string(),
        tech_stack: state.answer("techStack").to_string(),
        bottlenecks: split_list(state.answer("bottlenecks")),
        bottleneck_map: prompts::string_map(bottleneck_map),
        faith_preference: FaithPreference::parse_lenient(state.answer("faithPreference")),
        tone_preference: "direct".to_string(),
        communication_style: "short".to_string(),
        created_at,
        updated_at: now,
    }
}

/// Map the offer payload onto typed fields; anything missing stays empty.
pub fn build_offer(user_id: &str, payload: &Map<String, Value>) -> Offer {
    let field = |key: &str| prompts::field_str(payload, key);
    Offer {
        user_id: user_id.to_string(),
        offer_name: field("offerName"),
        avatar: field("avatar"),
        problem: field("problem"),
        promise: field("promise"),
        price_point: field("pricePoint"),
        unique_mechanism: field("uniqueMechanism"),
        program_structure: field("programStructure"),
        guarantees: field("guarantees"),
        backend_systems: field("backendSystems"),
        last_updated: Utc::now(),
    }
}

/// Parse a generated roadmap. `None` unless it has at least one stage.
pub fn parse_roadmap(user_id: &str, text: &str) -> Option<Roadmap> {
    let (start, end) = prompts::first_json_object(text)?;
    let mut roadmap: Roadmap = serde_json::from_str(&text[start..end]).ok()?;
    if !roadmap.normalize() {
        return None;
    }
    roadmap.user_id = user_id.to_string();
    roadmap.last_updated = Utc::now();
    Some(roadmap)
}

//! Prompt templates for the coaching features.

use serde::{Deserialize, Serialize};

use crate::memory::{FaithPreference, Offer, Profile, PushLevel, PushModeState, Roadmap};

pub const CHAT_MAX_TOKENS: u32 = 800;
pub const MINDSET_MAX_TOKENS: u32 = 900;
pub const MARKETING_MAX_TOKENS: u32 = 1400;
pub const SALES_REVIEW_MAX_TOKENS: u32 = 1800;
pub const HIRING_MAX_TOKENS: u32 = 1200;

/// Which faith preference the coach honours, set by an administrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaithMode {
    /// Use the profile preference, defaulting to `light` when unknown.
    Global,
    /// Use the profile preference, defaulting to `off`.
    #[default]
    User,
    /// Never use faith language.
    Off,
}

impl std::str::FromStr for FaithMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "user" => Ok(Self::User),
            "off" => Ok(Self::Off),
            other => Err(format!("unknown faith mode '{other}' (global, user, off)")),
        }
    }
}

impl std::fmt::Display for FaithMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::User => write!(f, "user"),
            Self::Off => write!(f, "off"),
        }
    }
}

impl FaithMode {
    pub fn effective(&self, profile: Option<&Profile>) -> FaithPreference {
        match self {
            Self::Off => FaithPreference::Off,
            Self::Global => profile
                .map(|p| p.faith_preference)
                .unwrap_or(FaithPreference::Light),
            Self::User => profile
                .map(|p| p.faith_preference)
                .unwrap_or(FaithPreference::Off),
        }
    }
}

/// Everything the coaching system prompt is built from.
#[derive(Debug, Default)]
pub struct CoachContext<'a> {
    pub profile: Option<&'a Profile>,
    pub roadmap: Option<&'a Roadmap>,
    pub pushmode: Option<&'a PushModeState>,
    pub offer: Option<&'a Offer>,
    pub global_tone: Option<&'a str>,
    pub faith_mode: FaithMode,
}

fn faith_instruction(faith: FaithPreference) -> &'static str {
    match faith {
        FaithPreference::Off => "Do not mention faith or Christianity.",
        FaithPreference::Light => {
            "You may gently reference Christian values or faith, but keep it subtle, optional, and respectful."
        }
        FaithPreference::Strong => {
            "You may integrate Christian language, scripture, and faith-based encouragement, but keep it grounded and practical for business."
        }
    }
}

fn pushmode_instruction(pushmode: Option<&PushModeState>) -> &'static str {
    match pushmode {
        Some(state) if state.enabled => match state.level {
            PushLevel::Extreme => {
                "Use very direct, tough-love coaching. Challenge excuses firmly, but never be abusive or demeaning."
            }
            PushLevel::Strong => {
                "Use a direct, tough-love coaching style. Call out inconsistencies and push the user firmly while staying respectful."
            }
            PushLevel::Normal => {
                "Use a slightly more direct tone than usual, reminding the user of their commitments and goals."
            }
        },
        _ => "Use a supportive, direct, but kind tone.",
    }
}

fn or_unknown<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback,
    }
}

/// The base system instruction for every coaching reply.
pub fn coaching_system_prompt(ctx: &CoachContext<'_>) -> String {
    let profile = ctx.profile;
    let name = or_unknown(profile.map(|p| p.business_name.as_str()), "their business");
    let niche = or_unknown(profile.map(|p| p.niche.as_str()), "not specified");
    let revenue = or_unknown(profile.map(|p| p.current_revenue.as_str()), "unknown");
    let goals = or_unknown(profile.map(|p| p.primary_goals.as_str()), "not specified");
    let faith = ctx.faith_mode.effective(profile);

    let roadmap_info = match ctx.roadmap {
        Some(roadmap) => match roadmap.current_stage() {
            Some(stage) => format!("Current roadmap stage: {} ({}).", stage.id, stage.name),
            None => format!("Current roadmap stage: {}.", roadmap.current_stage_id),
        },
        None => "Roadmap not yet defined.".to_string(),
    };

    let offer_section = match ctx.offer {
        Some(offer) => format!(
            "Offer context:
- Offer name: {}
- Avatar: {}
- Promise: {}
- Price: {}
- Unique mechanism: {}",
            offer.offer_name, offer.avatar, offer.promise, offer.price_point, offer.unique_mechanism
        ),
        None => "Offer not yet fully defined.".to_string(),
    };

    let tone = match ctx.global_tone {
        Some(tone) if !tone.trim().is_empty() => format!("\nGlobal tone override: {tone}"),
        _ => String::new(),
    };

    format!(
        "You are a done-with-you business coach for agency owners and coaches.
Your job is to help them scale from 0 to $100k/month+ using clear strategy, execution guidance,
accountability, sales training, marketing assets, offer building, hiring systems, and mindset support.

You must ALWAYS stay in the lane of business, execution, sales, and mindset. Do not give medical or psychological diagnoses.

User context:
- Business name: {name}
- Niche: {niche}
- Current revenue: {revenue}
- Primary goals: {goals}
- Faith preference: {faith}
{roadmap_info}

{offer_section}

{faith_line}
{push_line}{tone}
Always respond with clear, actionable steps, in bullet points where helpful.",
        faith_line = faith_instruction(faith),
        push_line = pushmode_instruction(ctx.pushmode),
    )
}

fn json_or_null<T: Serialize>(value: Option<&T>) -> String {
    value
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| "null".to_string())
}

pub fn marketing_prompt(
    kind: &str,
    profile: Option<&Profile>,
    roadmap: Option<&Roadmap>,
    offer: Option<&Offer>,
    extra: Option<&str>,
) -> String {
    format!(
        "You are generating high-converting {kind} for an agency/coaching business.

Profile:
{profile}

Roadmap:
{roadmap}

Offer:
{offer}

Extra instructions from user: {extra}

Produce clear, copy-pasteable assets. Number each asset, and label sections clearly.
Avoid filler and focus on what will actually drive leads and sales.",
        profile = json_or_null(profile),
        roadmap = json_or_null(roadmap),
        offer = json_or_null(offer),
        extra = or_unknown(extra, "none"),
    )
}

pub fn sales_review_prompt(
    transcript: &str,
    profile: Option<&Profile>,
    offer: Option<&Offer>,
) -> String {
    format!(
        "You are a world-class sales coach.

A sales call transcript/summary is below:

{transcript}

User profile:
{profile}

Offer:
{offer}

Do the following:
1) Score the call on: rapport, discovery, offer positioning, objection handling, closing. Use 1-10 scores.
2) Give 5-10 bullet points: what went well.
3) Give 5-10 bullet points: what needs improvement.
4) Rewrite a stronger sales script outline tailored to this offer and avatar.
5) Provide specific objection-handling lines for top 5 likely objections.

Respond in sections with headings.",
        profile = json_or_null(profile),
        offer = json_or_null(offer),
    )
}

pub fn hiring_prompt(mode: &str, role: &str, profile: Option<&Profile>) -> String {
    format!(
        "You are a hiring and training assistant for an agency/coaching business.

Role: {role}
Mode: {mode}
Profile:
{profile}

If mode=jd: write a job description, responsibilities, requirements, and preferred traits.
If mode=interview: write an interview script, questions, and scoring rubric.
If mode=sop: write an SOP outline and onboarding checklist.

Use bullet points and clear headings.",
        profile = json_or_null(profile),
    )
}

pub fn mindset_prompt(message: &str, profile: Option<&Profile>, faith: FaithPreference) -> String {
    format!(
        "You are a mindset and identity-level coach for a business owner.
You help with procrastination, fear, imposter syndrome, money mindset, and taking bold action.

User message:
{message}

Profile:
{profile}

Faith preference: {faith}

Do:
- Reflect the user's feelings briefly.
- Reframe their beliefs with logic and identity-level coaching.
- Offer 3-5 concrete next actions.
- If faith preference is \"light\" or \"strong\", you may integrate Christian encouragement; if \"strong\", you can reference scripture appropriately.
Avoid medical/therapy language and diagnoses.",
        profile = json_or_null(profile),
    )
}

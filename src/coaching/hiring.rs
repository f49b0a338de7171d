//! Hiring documents: job descriptions, interview kits, SOPs.

use crate::error::CoachingError;

use super::Coach;
use super::prompts::{HIRING_MAX_TOKENS, hiring_prompt};

const HIRING_SYSTEM: &str = "You are a hiring and training assistant for an agency/coaching business.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiringMode {
    Jd,
    Interview,
    Sop,
}

impl std::str::FromStr for HiringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jd" => Ok(Self::Jd),
            "interview" => Ok(Self::Interview),
            "sop" => Ok(Self::Sop),
            other => Err(format!("unknown hiring mode '{other}' (jd, interview, sop)")),
        }
    }
}

impl std::fmt::Display for HiringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jd => write!(f, "jd"),
            Self::Interview => write!(f, "interview"),
            Self::Sop => write!(f, "sop"),
        }
    }
}

impl Coach {
    pub async fn hiring_doc(
        &self,
        user_id: &str,
        mode: HiringMode,
        role: &str,
    ) -> Result<String, CoachingError> {
        let role = role.trim();
        if role.is_empty() {
            return Err(CoachingError::InvalidInput("role is required".into()));
        }
        let profile = self.memory().profile(user_id).await?;
        Ok(self
            .llm()
            .generate(
                HIRING_SYSTEM,
                &hiring_prompt(&mode.to_string(), role, profile.as_ref()),
                HIRING_MAX_TOKENS,
            )
            .await?)
    }
}

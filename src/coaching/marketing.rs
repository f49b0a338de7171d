//! Marketing asset generation.

use crate::error::CoachingError;

use super::Coach;
use super::prompts::{MARKETING_MAX_TOKENS, marketing_prompt};

const MARKETING_SYSTEM: &str =
    "You are generating marketing assets for an agency/coaching business.";

impl Coach {
    /// `kind` is free text such as "cold emails" or "VSL script".
    pub async fn marketing_assets(
        &self,
        user_id: &str,
        kind: &str,
        extra: Option<&str>,
    ) -> Result<String, CoachingError> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(CoachingError::InvalidInput("asset kind is required".into()));
        }
        let profile = self.memory().profile(user_id).await?;
        let roadmap = self.memory().roadmap(user_id).await?;
        let offer = self.memory().offer(user_id).await?;

        let prompt = marketing_prompt(
            kind,
            profile.as_ref(),
            roadmap.as_ref(),
            offer.as_ref(),
            extra,
        );
        Ok(self
            .llm()
            .generate(MARKETING_SYSTEM, &prompt, MARKETING_MAX_TOKENS)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::memory::Offer;

    #[tokio::test]
    async fn prompt_includes_offer() {
        let llm = RecordingLlm::replying("1. Subject line...");
        let coach = coach_with(llm.clone());
        let offer = Offer {
            offer_name: "Patient Flow".into(),
            ..Default::default()
        };
        coach.memory().set_offer("U1", &offer).await.unwrap();

        let out = coach
            .marketing_assets("U1", "cold emails", Some("short"))
            .await
            .unwrap();
        assert_eq!(out, "1. Subject line...");

        let request = llm.last_request();
        assert_eq!(request.max_tokens, MARKETING_MAX_TOKENS);
        assert!(request.prompt.contains("Patient Flow"));
        assert!(request.prompt.contains("Extra instructions from user: short"));
    }
}

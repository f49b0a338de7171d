//! Sales call reviews. The latest reviews are kept per user.

use chrono::Utc;

use crate::error::CoachingError;
use crate::memory::SalesReview;

use super::prompts::{SALES_REVIEW_MAX_TOKENS, sales_review_prompt};
use super::{Coach, truncate_chars};

const SALES_SYSTEM: &str = "You are an expert sales coach.";
const SNIPPET_CHARS: usize = 500;

impl Coach {
    pub async fn review_sales_call(
        &self,
        user_id: &str,
        transcript: &str,
    ) -> Result<String, CoachingError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(CoachingError::InvalidInput(
                "paste a transcript or call summary".into(),
            ));
        }
        let profile = self.memory().profile(user_id).await?;
        let offer = self.memory().offer(user_id).await?;

        let feedback = self
            .llm()
            .generate(
                SALES_SYSTEM,
                &sales_review_prompt(transcript, profile.as_ref(), offer.as_ref()),
                SALES_REVIEW_MAX_TOKENS,
            )
            .await?;

        let review = SalesReview {
            ts: Utc::now(),
            transcript_snippet: truncate_chars(transcript, SNIPPET_CHARS).to_string(),
            feedback: feedback.clone(),
        };
        self.memory().push_sales_review(user_id, &review).await?;
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::memory::SALES_REVIEWS_KEEP;

    #[tokio::test]
    async fn reviews_are_stored_and_capped() {
        let coach = coach_with(RecordingLlm::replying("Rapport: 7/10"));
        for i in 0..(SALES_REVIEWS_KEEP + 3) {
            coach
                .review_sales_call("U1", &format!("call {i} {}", "x".repeat(600)))
                .await
                .unwrap();
        }
        let reviews = coach.memory().sales_reviews("U1", 100).await.unwrap();
        assert_eq!(reviews.len(), SALES_REVIEWS_KEEP);
        assert!(reviews[0].transcript_snippet.starts_with(&format!("call {}", SALES_REVIEWS_KEEP + 2)));
        assert_eq!(reviews[0].transcript_snippet.chars().count(), SNIPPET_CHARS);
        assert_eq!(reviews[0].feedback, "Rapport: 7/10");
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected() {
        let coach = coach_with(RecordingLlm::replying("x"));
        assert!(matches!(
            coach.review_sales_call("U1", "  ").await,
            Err(CoachingError::InvalidInput(_))
        ));
    }
}

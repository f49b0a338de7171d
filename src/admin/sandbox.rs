//! `admin_sandbox`: preview what the coach would do with a message.
//! Never writes.

use serde::Serialize;

use crate::error::AdminError;
use crate::wizard::FlowType;

use super::Admin;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SandboxPreview {
    pub user_id: String,
    pub message: String,
    /// Set when the message would be taken as a wizard answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_flow: Option<FlowType>,
    pub result: String,
}

impl Admin {
    pub async fn sandbox(&self, user_id: &str, message: &str) -> Result<SandboxPreview, AdminError> {
        let (active_flow, result) = match self.wizard.active_flow(user_id).await? {
            Some(state) => {
                let result = match state.current_question() {
                    Some(q) => format!(
                        "Would record this as the answer to \"{}\" (step {} of {}).",
                        q.key,
                        state.step_index + 1,
                        state.total_steps()
                    ),
                    None => "Would retry finalization of the completed wizard.".to_string(),
                };
                (Some(state.flow), result)
            }
            None => (None, self.coach.preview_reply(user_id, message).await?),
        };

        Ok(SandboxPreview {
            user_id: user_id.to_string(),
            message: message.to_string(),
            active_flow,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn previews_chat_without_history() {
        let admin = admin();
        let preview = admin.sandbox("U1", "What next?").await.unwrap();
        assert_eq!(preview.result, "preview reply");
        assert!(preview.active_flow.is_none());
        assert!(admin.memory().recent_history("U1", 5).await.unwrap().is_empty());
        assert!(admin.log().recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn previews_wizard_answer_without_recording() {
        let admin = admin();
        admin.wizard.start("U1", FlowType::OfferBuilder).await.unwrap();
        let preview = admin.sandbox("U1", "dentists").await.unwrap();
        assert_eq!(preview.active_flow, Some(FlowType::OfferBuilder));
        assert!(preview.result.contains("\"avatar\""));

        let state = admin
            .wizard
            .load("U1", FlowType::OfferBuilder)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.step_index, 0);
    }
}

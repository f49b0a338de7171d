//! WizardEngine: start, answer, cancel. Never calls the generation gateway;
//! finalization is a separate, retryable step (see `finalize`).

use std::sync::Arc;

use crate::error::WizardError;
use crate::store::StateStore;

use super::flows::Question;
use super::state::{FlowType, WizardState};

/// Compare-and-set rounds before `submit_answer` gives up.
pub const MAX_CAS_ATTEMPTS: usize = 8;

/// Result of one `submit_answer` call.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The flow has every answer and is waiting for finalization.
    pub done: bool,
    pub next_question: Option<&'static Question>,
    /// Whether this call stored an answer. `false` when the flow was already
    /// awaiting finalization.
    pub recorded: bool,
    pub state: WizardState,
}

/// Drives the wizard state machine against the store.
#[derive(Clone)]
pub struct WizardEngine {
    store: Arc<dyn StateStore>,
}

impl WizardEngine {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Begin a flow from its first question, replacing any prior state for
    /// the same flow.
    pub async fn start(&self, user_id: &str, flow: FlowType) -> Result<WizardState, WizardError> {
        let state = WizardState::new(flow);
        let key = flow.state_key(user_id);
        if self.store.get(&key).await?.is_some() {
            tracing::debug!(user_id, %flow, "Overwriting existing wizard state");
        }
        self.store.set(&key, &state.encode()?).await?;
        tracing::info!(user_id, %flow, "Wizard started");
        Ok(state)
    }

    pub fn current_question(state: &WizardState) -> Option<&'static Question> {
        state.current_question()
    }

    /// Load the persisted state along with the exact raw value it came from.
    async fn load_raw(
        &self,
        user_id: &str,
        flow: FlowType,
    ) -> Result<Option<(String, WizardState)>, WizardError> {
        let Some(raw) = self.store.get(&flow.state_key(user_id)).await? else {
            return Ok(None);
        };
        match WizardState::decode(flow, &raw) {
            Ok(state) => Ok(Some((raw, state))),
            Err(e) => {
                tracing::warn!(user_id, %flow, error = %e, "Corrupt wizard state, treating as absent");
                Ok(None)
            }
        }
    }

    pub async fn load(
        &self,
        user_id: &str,
        flow: FlowType,
    ) -> Result<Option<WizardState>, WizardError> {
        Ok(self.load_raw(user_id, flow).await?.map(|(_, state)| state))
    }

    /// The first flow (intake before offer builder) with persisted state.
    pub async fn active_flow(&self, user_id: &str) -> Result<Option<WizardState>, WizardError> {
        for flow in FlowType::ALL {
            if let Some(state) = self.load(user_id, flow).await? {
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    /// Record `raw_text` as the answer to the current question and advance.
    ///
    /// The read-modify-write is a compare-and-set on the whole state value:
    /// if another submission landed in between, the state is re-read and the
    /// answer applied to whatever question is now current.
    pub async fn submit_answer(
        &self,
        user_id: &str,
        flow: FlowType,
        raw_text: &str,
    ) -> Result<StepOutcome, WizardError> {
        let key = flow.state_key(user_id);

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some((raw, mut state)) = self.load_raw(user_id, flow).await? else {
                return Err(WizardError::NoActiveFlow { flow });
            };

            let Some(answered) = state.record_answer(raw_text) else {
                return Ok(StepOutcome {
                    done: true,
                    next_question: None,
                    recorded: false,
                    state,
                });
            };

            let encoded = state.encode()?;
            if self
                .store
                .compare_and_set(&key, Some(&raw), &encoded)
                .await?
            {
                tracing::debug!(
                    user_id,
                    %flow,
                    step = state.step_index,
                    key = answered.key,
                    "Wizard answer recorded"
                );
                return Ok(StepOutcome {
                    done: state.is_complete(),
                    next_question: state.current_question(),
                    recorded: true,
                    state,
                });
            }

            tracing::debug!(user_id, %flow, attempt, "Wizard state changed underneath, retrying");
        }

        tracing::warn!(user_id, %flow, "Giving up on contended wizard answer");
        Err(WizardError::Contention {
            flow,
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Delete the flow's state. Idempotent.
    pub async fn cancel(&self, user_id: &str, flow: FlowType) -> Result<bool, WizardError> {
        let removed = self.store.del(&flow.state_key(user_id)).await?;
        if removed {
            tracing::info!(user_id, %flow, "Wizard cancelled");
        }
        Ok(removed)
    }

    /// Drop state after a successful finalization.
    pub(crate) async fn clear(&self, user_id: &str, flow: FlowType) -> Result<(), WizardError> {
        self.store.del(&flow.state_key(user_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn engine() -> (WizardEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (WizardEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn start_persists_first_step() {
        let (engine, store) = engine();
        let state = engine.start("U1", FlowType::Intake).await.unwrap();
        assert_eq!(state.step_index, 0);
        assert_eq!(
            WizardEngine::current_question(&state).map(|q| q.key),
            Some("currentRevenue")
        );
        let raw = store.get("user:U1:intake_state").await.unwrap().unwrap();
        assert_eq!(raw, r#"{"stepIndex":0,"answers":{}}"#);
    }

    #[tokio::test]
    async fn start_overwrites_progress() {
        let (engine, _) = engine();
        engine.start("U1", FlowType::OfferBuilder).await.unwrap();
        engine.submit_answer("U1", FlowType::OfferBuilder, "a").await.unwrap();
        engine.start("U1", FlowType::OfferBuilder).await.unwrap();
        let state = engine.load("U1", FlowType::OfferBuilder).await.unwrap().unwrap();
        assert_eq!(state.step_index, 0);
        assert!(state.answers.is_empty());
    }

    #[tokio::test]
    async fn linear_progression_reports_done_on_last_answer() {
        let (engine, _) = engine();
        for flow in FlowType::ALL {
            engine.start("U1", flow).await.unwrap();
            let total = flow.definition().len();
            for i in 0..total {
                let outcome = engine.submit_answer("U1", flow, &format!("answer {i}")).await.unwrap();
                assert!(outcome.recorded);
                assert_eq!(outcome.done, i + 1 == total, "{flow} step {i}");
                assert_eq!(outcome.next_question.is_none(), i + 1 == total);
            }
            let state = engine.load("U1", flow).await.unwrap().unwrap();
            assert_eq!(state.step_index, total);
        }
    }

    #[tokio::test]
    async fn submit_without_flow_is_no_active_flow() {
        let (engine, _) = engine();
        let err = engine
            .submit_answer("U1", FlowType::Intake, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::NoActiveFlow { flow: FlowType::Intake }));
    }

    #[tokio::test]
    async fn submit_after_last_answer_changes_nothing() {
        let (engine, _) = engine();
        engine.start("U1", FlowType::OfferBuilder).await.unwrap();
        for i in 0..5 {
            engine.submit_answer("U1", FlowType::OfferBuilder, &i.to_string()).await.unwrap();
        }
        let before = engine.load("U1", FlowType::OfferBuilder).await.unwrap();
        let outcome = engine.submit_answer("U1", FlowType::OfferBuilder, "late").await.unwrap();
        assert!(outcome.done);
        assert!(!outcome.recorded);
        assert_eq!(engine.load("U1", FlowType::OfferBuilder).await.unwrap(), before);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (engine, _) = engine();
        assert!(!engine.cancel("U1", FlowType::Intake).await.unwrap());
        engine.start("U1", FlowType::Intake).await.unwrap();
        assert!(engine.cancel("U1", FlowType::Intake).await.unwrap());
        assert!(!engine.cancel("U1", FlowType::Intake).await.unwrap());
        assert!(engine.load("U1", FlowType::Intake).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_state_reads_as_absent() {
        let (engine, store) = engine();
        store.set("user:U1:intake_state", "{broken").await.unwrap();
        assert!(engine.load("U1", FlowType::Intake).await.unwrap().is_none());
        assert!(engine.active_flow("U1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn active_flow_prefers_intake() {
        let (engine, _) = engine();
        engine.start("U1", FlowType::OfferBuilder).await.unwrap();
        assert_eq!(
            engine.active_flow("U1").await.unwrap().map(|s| s.flow),
            Some(FlowType::OfferBuilder)
        );
        engine.start("U1", FlowType::Intake).await.unwrap();
        assert_eq!(
            engine.active_flow("U1").await.unwrap().map(|s| s.flow),
            Some(FlowType::Intake)
        );
    }

    #[tokio::test]
    async fn concurrent_answers_are_all_kept() {
        let (engine, _) = engine();
        engine.start("U1", FlowType::Intake).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..4 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .submit_answer("U1", FlowType::Intake, &format!("dup {i}"))
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().recorded);
        }

        let state = engine.load("U1", FlowType::Intake).await.unwrap().unwrap();
        assert_eq!(state.step_index, 4);
        assert_eq!(state.answers.len(), 4);
        let mut values: Vec<_> = state.answers.values().cloned().collect();
        values.sort();
        assert_eq!(values, vec!["dup 0", "dup 1", "dup 2", "dup 3"]);
    }
}

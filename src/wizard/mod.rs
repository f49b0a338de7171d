//! Multi-turn question wizards (intake, offer builder).
//!
//! `WizardEngine` owns the resumable per-user state; `Finalizer` turns a
//! completed wizard into domain records through the generation gateway.

pub mod engine;
pub mod finalize;
pub mod flows;
pub mod prompts;
pub mod state;

pub use engine::{StepOutcome, WizardEngine};
pub use finalize::{Finalizer, IntakeOutcome, OfferOutcome};
pub use flows::{FlowDefinition, Question};
pub use state::{FlowType, WizardPhase, WizardState};

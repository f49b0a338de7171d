//! Administrator commands over the same state the coach uses.
//!
//! Callers check `AdminPolicy` first. Every mutating command writes an
//! `AdminLogRecord`.

pub mod actions;
pub mod auth;
pub mod config;
pub mod entries;
pub mod log;
pub mod reports;
pub mod sandbox;
pub mod state;

pub use auth::AdminPolicy;
pub use log::AdminLog;
pub use reports::{EngagementReport, StageReport, WizardProgress, WizardReport};
pub use sandbox::SandboxPreview;

use crate::coaching::Coach;
use crate::error::AdminError;
use crate::memory::UserMemory;
use crate::wizard::WizardEngine;

#[derive(Clone)]
pub struct Admin {
    coach: Coach,
    wizard: WizardEngine,
    log: AdminLog,
    policy: AdminPolicy,
}

impl Admin {
    pub fn new(coach: Coach, wizard: WizardEngine, policy: AdminPolicy) -> Self {
        let log = AdminLog::new(coach.memory().store().clone());
        Self {
            coach,
            wizard,
            log,
            policy,
        }
    }

    pub fn is_admin(&self, user_id: &str, roles: &[String]) -> bool {
        self.policy.is_admin(user_id, roles)
    }

    pub fn authorize(&self, user_id: &str, roles: &[String]) -> Result<(), AdminError> {
        if self.policy.is_admin(user_id, roles) {
            Ok(())
        } else {
            tracing::warn!(user_id, "Rejected admin command from non-admin");
            Err(AdminError::Unauthorized)
        }
    }

    pub fn log(&self) -> &AdminLog {
        &self.log
    }

    fn memory(&self) -> &UserMemory {
        self.coach.memory()
    }
}

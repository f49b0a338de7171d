//! Domain record store: typed accessors over the `StateStore`.
//!
//! Each accessor reads or writes exactly one key, so writing a profile and a
//! roadmap is two independent operations. A value that no longer parses is
//! logged and treated as absent.

pub mod model;

pub use model::*;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::store::StateStore;
use crate::store::keys;

/// Chat turns kept per user.
pub const HISTORY_KEEP: usize = 50;
/// Sales reviews kept per user.
pub const SALES_REVIEWS_KEEP: usize = 20;

/// Typed per-user record accessors.
#[derive(Clone)]
pub struct UserMemory {
    store: Arc<dyn StateStore>,
}

impl UserMemory {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored record does not parse, treating as absent");
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))?;
        self.store.set(key, &raw).await
    }

    pub async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.get_json(&keys::profile(user_id)).await
    }

    pub async fn set_profile(&self, user_id: &str, profile: &Profile) -> Result<(), StoreError> {
        self.set_json(&keys::profile(user_id), profile).await
    }

    pub async fn roadmap(&self, user_id: &str) -> Result<Option<Roadmap>, StoreError> {
        self.get_json(&keys::roadmap(user_id)).await
    }

    pub async fn set_roadmap(&self, user_id: &str, roadmap: &Roadmap) -> Result<(), StoreError> {
        self.set_json(&keys::roadmap(user_id), roadmap).await
    }

    pub async fn offer(&self, user_id: &str) -> Result<Option<Offer>, StoreError> {
        self.get_json(&keys::offer(user_id)).await
    }

    pub async fn set_offer(&self, user_id: &str, offer: &Offer) -> Result<(), StoreError> {
        self.set_json(&keys::offer(user_id), offer).await
    }

    pub async fn habits(&self, user_id: &str) -> Result<Option<Habits>, StoreError> {
        self.get_json(&keys::habits(user_id)).await
    }

    pub async fn set_habits(&self, user_id: &str, habits: &Habits) -> Result<(), StoreError> {
        self.set_json(&keys::habits(user_id), habits).await
    }

    /// Record a completion for `date`. Returns `false` if that day was
    /// already logged.
    pub async fn log_habit_completion(
        &self,
        user_id: &str,
        habit_id: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let day = date.format("%Y-%m-%d").to_string();
        self.store
            .set_add(&keys::habit_log(user_id, habit_id), &day)
            .await
    }

    /// Number of distinct days a habit was completed.
    pub async fn habit_completion_count(
        &self,
        user_id: &str,
        habit_id: &str,
    ) -> Result<usize, StoreError> {
        self.store.set_card(&keys::habit_log(user_id, habit_id)).await
    }

    pub async fn pushmode(&self, user_id: &str) -> Result<Option<PushModeState>, StoreError> {
        self.get_json(&keys::pushmode(user_id)).await
    }

    pub async fn set_pushmode(
        &self,
        user_id: &str,
        state: &PushModeState,
    ) -> Result<(), StoreError> {
        self.set_json(&keys::pushmode(user_id), state).await
    }

    pub async fn mindset(&self, user_id: &str) -> Result<Option<MindsetState>, StoreError> {
        self.get_json(&keys::mindset(user_id)).await
    }

    pub async fn set_mindset(&self, user_id: &str, state: &MindsetState) -> Result<(), StoreError> {
        self.set_json(&keys::mindset(user_id), state).await
    }

    pub async fn append_history(
        &self,
        user_id: &str,
        role: HistoryRole,
        content: &str,
    ) -> Result<(), StoreError> {
        let entry = HistoryEntry {
            role,
            content: content.to_string(),
            ts: Utc::now(),
        };
        let raw = serde_json::to_string(&entry)
            .map_err(|e| StoreError::Serialization(format!("history entry: {e}")))?;
        self.store
            .list_push(&keys::history(user_id), &raw, HISTORY_KEEP)
            .await
    }

    /// Most recent turns in chronological order (oldest first).
    pub async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let raw = self.store.list_range(&keys::history(user_id), limit).await?;
        let mut entries: Vec<HistoryEntry> = raw
            .iter()
            .filter_map(|item| serde_json::from_str(item).ok())
            .collect();
        entries.reverse();
        Ok(entries)
    }

    pub async fn push_sales_review(
        &self,
        user_id: &str,
        review: &SalesReview,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(review)
            .map_err(|e| StoreError::Serialization(format!("sales review: {e}")))?;
        self.store
            .list_push(&keys::sales_reviews(user_id), &raw, SALES_REVIEWS_KEEP)
            .await
    }

    /// Stored reviews, newest first.
    pub async fn sales_reviews(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SalesReview>, StoreError> {
        let raw = self
            .store
            .list_range(&keys::sales_reviews(user_id), limit)
            .await?;
        Ok(raw
            .iter()
            .filter_map(|item| serde_json::from_str(item).ok())
            .collect())
    }

    /// Runtime configuration value from `config:{name}`.
    pub async fn config(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.get_json(&keys::config(name)).await
    }

    pub async fn set_config(&self, name: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        self.set_json(&keys::config(name), value).await
    }

    /// Delete every key owned by a user. Returns how many were removed.
    pub async fn reset(&self, user_id: &str) -> Result<usize, StoreError> {
        let owned = self
            .store
            .scan_keys(&keys::user_prefix_pattern(user_id))
            .await?;
        let mut deleted = 0;
        for key in &owned {
            if self.store.del(key).await? {
                deleted += 1;
            }
        }
        tracing::info!(user_id, deleted, "User memory reset");
        Ok(deleted)
    }
}

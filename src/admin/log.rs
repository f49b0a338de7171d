//! Append-only audit log under `admin:logs:{millis}:{uuid}`.

use std::sync::Arc;

use chrono::Utc;

use crate::error::StoreError;
use crate::memory::AdminLogRecord;
use crate::store::StateStore;
use crate::store::keys;

#[derive(Clone)]
pub struct AdminLog {
    store: Arc<dyn StateStore>,
}

impl AdminLog {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Write one record. Records are never updated afterwards.
    pub async fn record(
        &self,
        actor_id: &str,
        target_user_id: Option<&str>,
        action: &str,
        diff: Option<serde_json::Value>,
    ) -> Result<AdminLogRecord, StoreError> {
        let record = AdminLogRecord {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            target_user_id: target_user_id.map(String::from),
            action: action.to_string(),
            diff,
            timestamp: Utc::now(),
        };
        let raw = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(format!("admin log: {e}")))?;
        let key = keys::admin_log(record.timestamp.timestamp_millis(), &record.id);
        self.store.set(&key, &raw).await?;
        tracing::info!(actor_id, action, target = ?target_user_id, "Admin action logged");
        Ok(record)
    }

    /// Newest records first. Entries that do not parse are skipped.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AdminLogRecord>, StoreError> {
        let mut records = Vec::new();
        for key in self.store.scan_keys(keys::ADMIN_LOG_PATTERN).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<AdminLogRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => tracing::debug!(key, error = %e, "Skipping unreadable admin log entry"),
            }
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}

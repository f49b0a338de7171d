//! `admin_memory`: raw access to `user:{id}:{key}` entries.

use serde_json::{Value, json};

use crate::error::AdminError;
use crate::store::keys;

use super::Admin;

fn validate_name(name: &str) -> Result<&str, AdminError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['*', '?', '[']) {
        return Err(AdminError::InvalidInput(format!(
            "'{name}' is not a valid entry name"
        )));
    }
    Ok(name)
}

impl Admin {
    pub async fn memory_get(&self, user_id: &str, name: &str) -> Result<Option<String>, AdminError> {
        let name = validate_name(name)?;
        Ok(self
            .memory()
            .store()
            .get(&keys::user_entry(user_id, name))
            .await?)
    }

    /// Store `value` as JSON. Text that is not already JSON is stored as a
    /// JSON string.
    pub async fn memory_set(
        &self,
        actor: &str,
        user_id: &str,
        name: &str,
        value: &str,
    ) -> Result<Value, AdminError> {
        let name = validate_name(name)?;
        let parsed = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        self.memory()
            .store()
            .set(&keys::user_entry(user_id, name), &parsed.to_string())
            .await?;
        self.log
            .record(
                actor,
                Some(user_id),
                "memory.set",
                Some(json!({ "key": name, "value": parsed })),
            )
            .await?;
        Ok(parsed)
    }

    pub async fn memory_delete(
        &self,
        actor: &str,
        user_id: &str,
        name: &str,
    ) -> Result<bool, AdminError> {
        let name = validate_name(name)?;
        let removed = self
            .memory()
            .store()
            .del(&keys::user_entry(user_id, name))
            .await?;
        self.log
            .record(
                actor,
                Some(user_id),
                "memory.delete",
                Some(json!({ "key": name, "removed": removed })),
            )
            .await?;
        Ok(removed)
    }
}

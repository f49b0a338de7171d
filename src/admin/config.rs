//! `admin_config`: runtime settings under `config:{key}`.

use serde_json::{Value, json};

use crate::coaching::{FaithMode, settings_keys};
use crate::error::AdminError;

use super::Admin;

fn known_key(name: &str) -> Result<&'static str, AdminError> {
    settings_keys::ALL
        .iter()
        .copied()
        .find(|k| *k == name.trim())
        .ok_or_else(|| AdminError::UnknownField(name.to_string()))
}

impl Admin {
    pub async fn config_get(&self, name: &str) -> Result<Option<Value>, AdminError> {
        let key = known_key(name)?;
        Ok(self.memory().config(key).await?)
    }

    /// Set a runtime setting. An empty value clears it back to the default.
    pub async fn config_set(
        &self,
        actor: &str,
        name: &str,
        value: &str,
    ) -> Result<Value, AdminError> {
        let key = known_key(name)?;
        let value = value.trim();

        let new = if value.is_empty() {
            Value::Null
        } else if key == settings_keys::FAITH_MODE {
            let mode: FaithMode = value.parse().map_err(AdminError::InvalidInput)?;
            Value::String(mode.to_string())
        } else {
            Value::String(value.to_string())
        };

        let old = self.memory().config(key).await?;
        self.memory().set_config(key, &new).await?;
        self.log
            .record(
                actor,
                None,
                "config.set",
                Some(json!({ "key": key, "before": old, "after": new })),
            )
            .await?;
        Ok(new)
    }
}

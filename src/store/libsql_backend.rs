//! libSQL backend: durable `StateStore` implementation.
//!
//! String values, set members and list items live in three tables that share
//! one key space. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::StateStore;

/// libSQL key/value store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use;
/// every mutating method is a single statement so single-key atomicity holds
/// without explicit transactions.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(store.conn()).await?;
        info!(path = %path.display(), "State store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(store.conn()).await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a query whose rows each carry one TEXT column.
    async fn query_strings(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<String>, StoreError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| StoreError::Query(format!("{op}: {e}")))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("{op}: {e}")))?
        {
            let value: String = row
                .get(0)
                .map_err(|e| StoreError::Query(format!("{op}: {e}")))?;
            out.push(value);
        }
        Ok(out)
    }
}

#[async_trait]
impl StateStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut values = self
            .query_strings("get", "SELECT value FROM kv_values WHERE key = ?1", params![key])
            .await?;
        Ok(values.pop())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO kv_values (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set: {e}")))?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let now = Utc::now().to_rfc3339();
        let affected = match expected {
            Some(old) => self
                .conn()
                .execute(
                    "UPDATE kv_values SET value = ?3, updated_at = ?4
                     WHERE key = ?1 AND value = ?2",
                    params![key, old, value, now],
                )
                .await,
            None => self
                .conn()
                .execute(
                    "INSERT INTO kv_values (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT (key) DO NOTHING",
                    params![key, value, now],
                )
                .await,
        }
        .map_err(|e| StoreError::Query(format!("compare_and_set: {e}")))?;

        Ok(affected == 1)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut removed = 0;
        for sql in [
            "DELETE FROM kv_values WHERE key = ?1",
            "DELETE FROM kv_set_members WHERE key = ?1",
            "DELETE FROM kv_list_items WHERE key = ?1",
        ] {
            removed += self
                .conn()
                .execute(sql, params![key])
                .await
                .map_err(|e| StoreError::Query(format!("del: {e}")))?;
        }
        Ok(removed > 0)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.query_strings(
            "scan_keys",
            "SELECT key FROM kv_values WHERE key GLOB ?1
             UNION SELECT key FROM kv_set_members WHERE key GLOB ?1
             UNION SELECT key FROM kv_list_items WHERE key GLOB ?1
             ORDER BY key",
            params![pattern],
        )
        .await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO kv_set_members (key, member) VALUES (?1, ?2)",
                params![key, member],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_add: {e}")))?;
        Ok(affected == 1)
    }

    async fn set_card(&self, key: &str) -> Result<usize, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM kv_set_members WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_card: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("set_card: {e}")))?
        {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("set_card: {e}")))?;
                Ok(count.max(0) as usize)
            }
            None => Ok(0),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.query_strings(
            "set_members",
            "SELECT member FROM kv_set_members WHERE key = ?1 ORDER BY member",
            params![key],
        )
        .await
    }

    async fn list_push(&self, key: &str, value: &str, keep: usize) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO kv_list_items (key, seq, value)
                 SELECT ?1, COALESCE(MAX(seq), 0) + 1, ?2 FROM kv_list_items WHERE key = ?1",
                params![key, value],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_push: {e}")))?;

        self.conn()
            .execute(
                "DELETE FROM kv_list_items WHERE key = ?1 AND seq NOT IN (
                     SELECT seq FROM kv_list_items WHERE key = ?1 ORDER BY seq DESC LIMIT ?2
                 )",
                params![key, keep as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_push trim: {e}")))?;
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.query_strings(
            "list_range",
            "SELECT value FROM kv_list_items WHERE key = ?1 ORDER BY seq DESC LIMIT ?2",
            params![key, limit as i64],
        )
        .await
    }
}

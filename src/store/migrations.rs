//! Schema for the libSQL state store, applied in numbered steps.

use libsql::Connection;

use crate::error::StoreError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Append only; versions must increase.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "kv_values",
        sql: r#"
            CREATE TABLE IF NOT EXISTS kv_values (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
        "#,
    },
    Migration {
        version: 2,
        name: "kv_collections",
        sql: r#"
            CREATE TABLE IF NOT EXISTS kv_set_members (
                key TEXT NOT NULL,
                member TEXT NOT NULL,
                added_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (key, member)
            );

            CREATE TABLE IF NOT EXISTS kv_list_items (
                key TEXT NOT NULL,
                seq INTEGER NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key, seq)
            );
        "#,
    },
];

fn migration_err(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Migration(format!("{context}: {e}"))
}

/// Bring the schema up to the newest version. Safe to call on every open.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .await
    .map_err(|e| migration_err("creating _migrations", e))?;

    let applied = schema_version(conn).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        tracing::debug!(version = applied, "Store schema up to date");
        return Ok(());
    }

    for m in pending {
        tracing::info!(version = m.version, name = m.name, "Applying store migration");
        conn.execute_batch(m.sql)
            .await
            .map_err(|e| migration_err(&format!("V{} {}", m.version, m.name), e))?;
        conn.execute(
            "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![m.version, m.name],
        )
        .await
        .map_err(|e| migration_err(&format!("recording V{}", m.version), e))?;
    }

    tracing::info!(version = schema_version(conn).await?, "Store schema migrated");
    Ok(())
}

/// Highest applied version; 0 for a fresh database.
async fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| migration_err("reading schema version", e))?;
    let Some(row) = rows
        .next()
        .await
        .map_err(|e| migration_err("reading schema version", e))?
    else {
        return Ok(0);
    };
    row.get::<i64>(0)
        .map_err(|e| migration_err("decoding schema version", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    #[tokio::test]
    async fn creates_value_set_and_list_tables() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in &["_migrations", "kv_values", "kv_set_members", "kv_list_items"] {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    libsql::params![*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            let count: i64 = row.get(0).unwrap();
            assert_eq!(count, 1, "Table '{}' should exist", table);
        }
    }

    #[tokio::test]
    async fn rerunning_is_a_no_op() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = schema_version(&conn).await.unwrap();
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn records_each_applied_version() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        let mut rows = conn
            .query("SELECT version, name FROM _migrations ORDER BY version", ())
            .await
            .unwrap();
        let row1 = rows.next().await.unwrap().unwrap();
        assert_eq!(row1.get::<i64>(0).unwrap(), 1);
        assert_eq!(row1.get::<String>(1).unwrap(), "kv_values");

        let row2 = rows.next().await.unwrap().unwrap();
        assert_eq!(row2.get::<i64>(0).unwrap(), 2);
        assert_eq!(row2.get::<String>(1).unwrap(), "kv_collections");
    }
}

use crate::error::StorageError;
use crate::storage::DurableStorage;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Database file name inside the configured storage directory
pub(crate) const DATABASE_FILE: &str = "audit.db";

/// SQLite-backed blob storage
///
/// Values live in a single `audit_blobs` table keyed by name.
pub struct SqliteStorage {
    db: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Database that disappears with the handle
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;

        Ok(Self {
            db: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS audit_blobs (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

impl DurableStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        let value = conn
            .query_row(
                "SELECT value FROM audit_blobs WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            r#"
            INSERT INTO audit_blobs (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM audit_blobs WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert!(init_schema(&conn).is_ok());
    }

    #[test]
    fn test_upsert_replaces_value() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.set("audit_log", "first").unwrap();
        storage.set("audit_log", "second").unwrap();
        assert_eq!(storage.get("audit_log").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_value_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db/audit.db");

        SqliteStorage::open(&path).unwrap().set("audit_log", "[]").unwrap();

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.get("audit_log").unwrap().as_deref(), Some("[]"));
    }
}

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Persistent string key/value store using SQLite
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Atomic writes, so a crash never leaves half a config behind
/// - Doesn't require a separate process
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    /// Open (or create) the store at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening local storage at {}", db_path.display());
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Throwaway store that lives as long as the value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO local_storage (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM local_storage ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Read a JSON value; a missing key is `Ok(None)`, a malformed one is an error
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_item(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get_item() {
        let storage = LocalStorage::in_memory().unwrap();

        assert_eq!(storage.get_item("theme").unwrap(), None);

        storage.set_item("theme", "dark").unwrap();
        assert_eq!(storage.get_item("theme").unwrap(), Some("dark".to_string()));

        storage.set_item("theme", "light").unwrap();
        assert_eq!(storage.get_item("theme").unwrap(), Some("light".to_string()));
    }

    #[test]
    fn test_remove_item_and_keys() {
        let storage = LocalStorage::in_memory().unwrap();
        storage.set_item("b", "2").unwrap();
        storage.set_item("a", "1").unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["a", "b"]);

        storage.remove_item("a").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["b"]);

        // Removing something that isn't there is fine
        storage.remove_item("missing").unwrap();
    }

    #[test]
    fn test_json_helpers() {
        let storage = LocalStorage::in_memory().unwrap();
        storage.set_json("numbers", &vec![1, 2, 3]).unwrap();

        let numbers: Option<Vec<i32>> = storage.get_json("numbers").unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        storage.set_item("broken", "{not json").unwrap();
        let broken: Result<Option<Vec<i32>>> = storage.get_json("broken");
        assert!(matches!(broken, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("storage.db");

        {
            let storage = LocalStorage::open(&path).unwrap();
            storage.set_item("search-services-config", "[]").unwrap();
        }

        let storage = LocalStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item("search-services-config").unwrap(),
            Some("[]".to_string())
        );
    }
}

//! SQLite-backed key-value storage for the persisted snapshot.

use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key under which the whole pomodoro snapshot is stored.
pub const STATE_KEY: &str = "pomodoro-state";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to create database directory")]
    DirectoryCreation,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at `path`, initializing tables if needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|_| DatabaseError::DirectoryCreation)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::initialize_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing).
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Platform data location, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "pomotick", "Pomotick")
            .map(|dirs| dirs.data_dir().join("pomotick.db"))
            .unwrap_or_else(|| PathBuf::from("pomotick.db"))
    }

    /// Reads the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Writes `value` under `key`, replacing whatever was there.
    pub fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    /// Deletes `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_creation() {
        let db = Database::new_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_get_missing_key() {
        let db = Database::new_in_memory().unwrap();
        assert_eq!(db.get(STATE_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let db = Database::new_in_memory().unwrap();
        db.set(STATE_KEY, "{}").unwrap();
        assert_eq!(db.get(STATE_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_set_overwrites() {
        let db = Database::new_in_memory().unwrap();
        db.set(STATE_KEY, "first").unwrap();
        db.set(STATE_KEY, "second").unwrap();
        assert_eq!(db.get(STATE_KEY).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_remove() {
        let db = Database::new_in_memory().unwrap();
        db.set(STATE_KEY, "value").unwrap();
        db.remove(STATE_KEY).unwrap();
        assert_eq!(db.get(STATE_KEY).unwrap(), None);

        // Removing again is fine
        db.remove(STATE_KEY).unwrap();
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pomotick.db");

        let db = Database::open(&path).unwrap();
        db.set(STATE_KEY, "persisted").unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get(STATE_KEY).unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_default_path_file_name() {
        let path = Database::default_path();
        assert_eq!(path.file_name().unwrap(), "pomotick.db");
    }
}

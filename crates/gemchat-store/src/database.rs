//! SQLite-backed key-value store.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! schema migrations are run before any other operation.  Every stored value
//! lives in the single `kv` table as JSON text.

use std::path::{Path, PathBuf};

use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use gemchat_shared::constants::APP_NAME;

use crate::error::{Result, StoreError};
use crate::kv::KeyValueStore;
use crate::migrations;

const DB_FILE_NAME: &str = "gemchat.db";

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/gemchat/gemchat.db`
    /// - macOS:   `~/Library/Application Support/dev.gemchat.gemchat/gemchat.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\gemchat\gemchat\data\gemchat.db`
    pub fn new() -> Result<Self> {
        Self::open_in_dir(&default_data_dir()?)
    }

    /// Open (or create) `gemchat.db` inside `dir`, creating the directory if
    /// needed.
    pub fn open_in_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE_NAME);

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

/// Platform data directory for the application.
pub fn default_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("dev", APP_NAME, APP_NAME).ok_or(StoreError::NoDataDir)?;
    Ok(project_dirs.data_dir().to_path_buf())
}

impl KeyValueStore for Database {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn open_in_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let db = Database::open_in_dir(&nested).expect("should open");
        assert!(nested.join(DB_FILE_NAME).exists());
        assert!(db.path().is_some());
    }

    #[test]
    fn default_data_dir_is_named_after_app() {
        // no home directory in some sandboxes
        if let Ok(dir) = default_data_dir() {
            assert!(dir.to_string_lossy().contains(APP_NAME));
        }
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("kv.db")).unwrap();

        assert_eq!(db.get_raw("missing").unwrap(), None);

        db.set("answer", &42u32).unwrap();
        assert_eq!(db.get::<u32>("answer").unwrap(), Some(42));

        db.set("answer", &43u32).unwrap();
        assert_eq!(db.get_raw("answer").unwrap().as_deref(), Some("43"));

        assert!(db.remove("answer").unwrap());
        assert!(!db.remove("answer").unwrap());
        assert_eq!(db.get_or("answer", 7u32).unwrap(), 7);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.set("currentChatId", "1700000000000").unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(
            db.get::<String>("currentChatId").unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[test]
    fn corrupt_value_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("bad.db")).unwrap();
        db.set_raw("chats", "{not json").unwrap();

        let err = db.get::<serde_json::Value>("chats").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}

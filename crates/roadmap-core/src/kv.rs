//! Client-local durable key-value stores.
//!
//! The vote ledger needs only two operations, `get` and `set`, over string
//! values. Three backings are provided:
//!
//! - [`MemoryStore`]: process-lifetime map, used in tests and when nothing
//!   durable is configured
//! - [`FileStore`]: one file per key under a directory, replaced atomically
//! - [`SqliteStore`]: a `kv_store` table in the roadmap database

use crate::error::ErrorCode;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Errors reported by a [`KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("key-value I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("key-value database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Keys must be plain `[A-Za-z0-9._-]` names so they map onto file names.
    #[error("invalid key '{0}'")]
    InvalidKey(String),

    /// The store is disabled in this environment.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

impl KvError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidKey(_) => ErrorCode::InternalUnexpected,
            Self::Io(_) | Self::Sqlite(_) | Self::Unavailable(_) => ErrorCode::StorageUnavailable,
        }
    }
}

/// A device-local persistent key-value mechanism.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] when the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] when the store cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        (**self).set(key, value)
    }
}

fn validate_key(key: &str) -> Result<(), KvError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidKey(key.to_string()))
    }
}

/// Process-lifetime store backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: each key is a file whose contents are the value.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Io`] if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, KvError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Store backed by the `kv_store` table of the roadmap database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wrap a connection that has already been migrated (see [`crate::db::open_db`]).
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the roadmap database at `path` and use its `kv_store` table.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Unavailable`] if the database cannot be opened or
    /// migrated.
    pub fn open(path: &Path) -> Result<Self, KvError> {
        let conn = crate::db::open_db(path).map_err(|e| KvError::Unavailable(format!("{e:#}")))?;
        Ok(Self::new(conn))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        validate_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        validate_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at_us) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at_us = excluded.updated_at_us",
            params![key, value, chrono::Utc::now().timestamp_micros()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &mut dyn KeyValueStore) {
        assert_eq!(store.get("roadmap.votes").expect("get"), None);
        store.set("roadmap.votes", "{\"a\":true}").expect("set");
        assert_eq!(
            store.get("roadmap.votes").expect("get").as_deref(),
            Some("{\"a\":true}")
        );
        store.set("roadmap.votes", "{}").expect("overwrite");
        assert_eq!(store.get("roadmap.votes").expect("get").as_deref(), Some("{}"));
    }

    #[test]
    fn memory_store_roundtrip() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn file_store_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileStore::open(dir.path()).expect("open");
        exercise(&mut store);

        let reopened = FileStore::open(dir.path()).expect("reopen");
        assert_eq!(reopened.get("roadmap.votes").expect("get").as_deref(), Some("{}"));
        assert!(!dir.path().join(".roadmap.votes.tmp").exists());
    }

    #[test]
    fn sqlite_store_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("roadmap.db");
        let mut store = SqliteStore::open(&path).expect("open");
        exercise(&mut store);
        drop(store);

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("roadmap.votes").expect("get").as_deref(), Some("{}"));
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileStore::open(dir.path()).expect("open");
        for key in ["", "../escape", ".hidden", "a/b"] {
            assert!(matches!(
                store.set(key, "x"),
                Err(KvError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn boxed_store_delegates() {
        let mut store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));
    }
}

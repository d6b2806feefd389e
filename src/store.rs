//! Durable single-slot record stores.
//!
//! Each store holds one opaque byte blob. Absence of the slot is normal and
//! reported as `Ok(None)`. Writes replace the whole blob atomically: a reader
//! observes either the previous or the new contents, never a partial write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{params, OptionalExtension};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::db::Db;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// A named persisted slot holding one serialized value.
pub trait RecordStore: Send {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Slot stored as one row of the `slots` table.
pub struct SqliteSlotStore {
    db: Arc<Db>,
    slot: String,
}

impl SqliteSlotStore {
    pub fn new(db: Arc<Db>, slot: impl Into<String>) -> Self {
        Self {
            db,
            slot: slot.into(),
        }
    }
}

impl RecordStore for SqliteSlotStore {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT data FROM slots WHERE name = ?1",
                params![self.slot],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
        })?)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO slots (name, data) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET
                    data = excluded.data,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
                params![self.slot, bytes],
            )
        })?;
        Ok(())
    }
}

/// Slot stored as a standalone file, replaced by rename on every write.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl RecordStore for FileStore {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(self.dir())?;
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|source| StoreError::Replace {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}

/// In-process slot. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes.to_vec());
        Ok(())
    }
}

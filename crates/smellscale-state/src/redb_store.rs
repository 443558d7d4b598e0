//! RedbStore — redb-backed blob persistence.
//!
//! The blob lives in the `scale_state` table under a fixed key. Writes are
//! redb write transactions, so a crash mid-write leaves the previous blob
//! intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::backend::BlobStore;
use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe blob store backed by redb.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    path: Option<PathBuf>,
}

impl RedbStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            path: Some(path.to_path_buf()),
        };
        store.ensure_tables()?;
        debug!(?path, "redb store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            path: None,
        };
        store.ensure_tables()?;
        debug!("in-memory redb store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SCALE_STATE).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SCALE_STATE).map_err(map_err!(Table))?;
            table.insert(key, bytes).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, len = bytes.len(), "blob stored");
        Ok(())
    }

    /// List blobs set aside by [`BlobStore::stash_corrupt`], oldest first.
    pub fn corrupt_blobs(&self) -> StateResult<Vec<(String, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SCALE_STATE).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(CORRUPT_PREFIX) {
                results.push((key.value().to_string(), value.value().to_vec()));
            }
        }
        Ok(results)
    }
}

impl BlobStore for RedbStore {
    fn read_blob(&self) -> StateResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SCALE_STATE).map_err(map_err!(Table))?;
        let blob = table
            .get(CURRENT_KEY)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(blob)
    }

    fn write_blob(&self, bytes: &[u8]) -> StateResult<()> {
        self.put(CURRENT_KEY, bytes)
    }

    fn stash_corrupt(&self, bytes: &[u8]) -> StateResult<()> {
        let key = format!("{CORRUPT_PREFIX}{}", Utc::now().to_rfc3339());
        self.put(&key, bytes)
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("redb:{}", path.display()),
            None => "redb:memory".to_string(),
        }
    }
}

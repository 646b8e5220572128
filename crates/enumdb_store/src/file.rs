//! JSON file store for persistent reference data.

use crate::backend::{RecordStore, WriteSession};
use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordId};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

type Document = BTreeMap<String, Vec<Record>>;

/// A record store persisted as a single JSON document.
///
/// The whole document is held in memory and rewritten when a write
/// session ends. The document maps collection names to record arrays:
///
/// ```json
/// { "colors": [ { "id": 1, "name": "red" } ] }
/// ```
///
/// # Durability
///
/// The document is written to a sibling temporary file and renamed over
/// the original, so a crash leaves either the old or the new document.
/// If writing fails, the in-memory document is rolled back to its state
/// when the session opened, so `list` never serves unpersisted records.
///
/// # Example
///
/// ```no_run
/// use enumdb_store::{JsonFileStore, Record, RecordStore};
/// use std::path::Path;
///
/// let store = JsonFileStore::open(Path::new("reference.json")).unwrap();
/// store.create("colors", Record::new(1).with("name", "red")).unwrap();
/// ```
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: RwLock<Document>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens a store at the given path, starting empty if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let document = if path.exists() {
            let bytes = fs::read(path)?;
            if bytes.is_empty() {
                Document::new()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            Document::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            document: RwLock::new(document),
            write_lock: Mutex::new(()),
        })
    }

    /// Opens a store, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot be read.
    pub fn open_with_create_dirs(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&*self.document.read())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn list(&self, collection: &str) -> StoreResult<Vec<Record>> {
        Ok(self
            .document
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn write(&self) -> StoreResult<Box<dyn WriteSession + '_>> {
        let guard = self.write_lock.lock();
        let original = self.document.read().clone();
        Ok(Box::new(FileWriteSession {
            store: self,
            _guard: guard,
            original,
            dirty: false,
        }))
    }
}

/// Write session over a [`JsonFileStore`].
///
/// Writes update the in-memory document at once; the file is rewritten on
/// `finish`, or on drop if the session ended early with pending writes.
struct FileWriteSession<'a> {
    store: &'a JsonFileStore,
    _guard: MutexGuard<'a, ()>,
    /// Document as of session start, restored if persisting fails.
    original: Document,
    dirty: bool,
}

impl FileWriteSession<'_> {
    fn persist(&mut self) -> StoreResult<()> {
        self.dirty = false;
        if let Err(err) = self.store.persist() {
            *self.store.document.write() = std::mem::take(&mut self.original);
            return Err(err);
        }
        Ok(())
    }
}

impl WriteSession for FileWriteSession<'_> {
    fn list(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.store.list(collection)
    }

    fn create(&mut self, collection: &str, record: Record) -> StoreResult<Record> {
        let mut document = self.store.document.write();
        let records = document.entry(collection.to_string()).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::already_exists(collection, record.id));
        }
        records.push(record.clone());
        self.dirty = true;
        Ok(record)
    }

    fn update(&mut self, collection: &str, record: Record) -> StoreResult<Record> {
        let mut document = self.store.document.write();
        let existing = document
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == record.id))
            .ok_or_else(|| StoreError::not_found(collection, record.id))?;
        *existing = record.clone();
        self.dirty = true;
        Ok(record)
    }

    fn delete(&mut self, collection: &str, id: RecordId) -> StoreResult<()> {
        let mut document = self.store.document.write();
        let records = document
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::not_found(collection, id));
        }
        self.dirty = true;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> StoreResult<()> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }
}

impl Drop for FileWriteSession<'_> {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(err) = self.persist() {
                tracing::warn!(path = %self.store.path.display(), error = %err, "failed to persist abandoned write session");
            }
        }
    }
}

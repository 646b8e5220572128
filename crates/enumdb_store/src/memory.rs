//! In-memory record store for testing.

use crate::backend::{RecordStore, WriteSession};
use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordId};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hook that lets tests make the store reject records.
///
/// Returning `Some(message)` rejects the write with a `Validation` error.
pub type Validator = Box<dyn Fn(&str, &Record) -> Option<String> + Send + Sync>;

/// An in-memory record store.
///
/// This store keeps all collections in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Reference data that is seeded at startup and never persisted
///
/// It also counts full scans, which lets tests assert how often the
/// cache actually reached the store.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use enumdb_store::{InMemoryStore, Record, RecordStore};
///
/// let store = InMemoryStore::new();
/// store.create("colors", Record::new(1).with("name", "red")).unwrap();
/// assert_eq!(store.list("colors").unwrap().len(), 1);
/// assert_eq!(store.list_calls(), 1);
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    write_lock: Mutex<()>,
    list_calls: AtomicUsize,
    validator: RwLock<Option<Validator>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with one pre-populated collection.
    #[must_use]
    pub fn with_records(collection: impl Into<String>, records: Vec<Record>) -> Self {
        let store = Self::new();
        store.collections.write().insert(collection.into(), records);
        store
    }

    /// Number of `list` calls served so far (session reads excluded).
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Installs a validation hook consulted on every create and update.
    pub fn set_validator(&self, validator: Validator) {
        *self.validator.write() = Some(validator);
    }

    /// Removes the validation hook.
    pub fn clear_validator(&self) {
        *self.validator.write() = None;
    }

    /// Replaces a record without going through a session.
    ///
    /// Simulates an out-of-band edit (another process, an administrator)
    /// that the cache has not been told about.
    pub fn put_raw(&self, collection: &str, record: Record) {
        let mut collections = self.collections.write();
        let records = collections.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    fn validate(&self, collection: &str, record: &Record) -> StoreResult<()> {
        if let Some(validator) = self.validator.read().as_ref() {
            if let Some(message) = validator(collection, record) {
                return Err(StoreError::validation(record.id, message));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("collections", &self.collections.read().len())
            .field("list_calls", &self.list_calls())
            .finish()
    }
}

impl RecordStore for InMemoryStore {
    fn list(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn write(&self) -> StoreResult<Box<dyn WriteSession + '_>> {
        Ok(Box::new(MemoryWriteSession {
            store: self,
            _guard: self.write_lock.lock(),
        }))
    }
}

/// Write session over an [`InMemoryStore`]. Writes apply immediately.
struct MemoryWriteSession<'a> {
    store: &'a InMemoryStore,
    _guard: MutexGuard<'a, ()>,
}

impl WriteSession for MemoryWriteSession<'_> {
    fn list(&self, collection: &str) -> StoreResult<Vec<Record>> {
        Ok(self
            .store
            .collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn create(&mut self, collection: &str, record: Record) -> StoreResult<Record> {
        self.store.validate(collection, &record)?;
        let mut collections = self.store.collections.write();
        let records = collections.entry(collection.to_string()).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::already_exists(collection, record.id));
        }
        records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, collection: &str, record: Record) -> StoreResult<Record> {
        self.store.validate(collection, &record)?;
        let mut collections = self.store.collections.write();
        let existing = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == record.id))
            .ok_or_else(|| StoreError::not_found(collection, record.id))?;
        *existing = record.clone();
        Ok(record)
    }

    fn delete(&mut self, collection: &str, id: RecordId) -> StoreResult<()> {
        let mut collections = self.store.collections.write();
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> StoreResult<()> {
        // Writes were applied eagerly
        Ok(())
    }
}

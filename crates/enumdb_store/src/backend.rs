//! Record store trait definitions.

use crate::error::StoreResult;
use crate::record::{Record, RecordId};

/// The authoritative home of enumeration records.
///
/// A store groups records into named collections. The cache only ever reads
/// a collection with a full [`list`](RecordStore::list) scan; every write
/// goes through a [`WriteSession`].
///
/// # Invariants
///
/// - `list` returns records in a stable order (insertion order for the
///   reference stores)
/// - Record ids are unique within a collection
/// - Only one write session is open at a time
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::JsonFileStore`] - For persistent storage
pub trait RecordStore: Send + Sync {
    /// Returns every record in `collection`, in store order.
    ///
    /// An unknown collection is empty, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list(&self, collection: &str) -> StoreResult<Vec<Record>>;

    /// Opens an exclusive write session.
    ///
    /// Blocks until any other session has been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed.
    fn write(&self) -> StoreResult<Box<dyn WriteSession + '_>>;

    /// Creates a single record in its own session.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the id is taken, or `Validation` if the
    /// store rejects the record.
    fn create(&self, collection: &str, record: Record) -> StoreResult<Record> {
        let mut session = self.write()?;
        let created = session.create(collection, record)?;
        session.finish()?;
        Ok(created)
    }

    /// Replaces a single record in its own session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has the id.
    fn update(&self, collection: &str, record: Record) -> StoreResult<Record> {
        let mut session = self.write()?;
        let updated = session.update(collection, record)?;
        session.finish()?;
        Ok(updated)
    }

    /// Deletes a single record in its own session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has the id.
    fn delete(&self, collection: &str, id: RecordId) -> StoreResult<()> {
        let mut session = self.write()?;
        session.delete(collection, id)?;
        session.finish()
    }
}

/// An exclusive, scoped write acquisition on a store.
///
/// Writes are applied in call order. A failed write does not undo the
/// writes before it; `finish` makes the applied writes durable.
pub trait WriteSession {
    /// Returns every record in `collection`, including this session's writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list(&self, collection: &str) -> StoreResult<Vec<Record>>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the id is taken.
    fn create(&mut self, collection: &str, record: Record) -> StoreResult<Record>;

    /// Replaces the record with the same id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has the id.
    fn update(&mut self, collection: &str, record: Record) -> StoreResult<Record>;

    /// Deletes the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has the id.
    fn delete(&mut self, collection: &str, id: RecordId) -> StoreResult<()>;

    /// Deletes every record whose id is not in `keep`.
    ///
    /// Returns the number of deleted records.
    ///
    /// # Errors
    ///
    /// Returns an error if a read or delete fails.
    fn delete_except(&mut self, collection: &str, keep: &[RecordId]) -> StoreResult<usize> {
        let doomed: Vec<RecordId> = self
            .list(collection)?
            .into_iter()
            .map(|r| r.id)
            .filter(|id| !keep.contains(id))
            .collect();
        for id in &doomed {
            self.delete(collection, *id)?;
        }
        Ok(doomed.len())
    }

    /// Ends the session, making its writes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the writes cannot be persisted.
    fn finish(self: Box<Self>) -> StoreResult<()>;
}

//! Hash index implementation.

use enumdb_store::{Record, RecordId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Hash-based index for O(1) equality lookups.
///
/// `HashIndex` maps a key to the records carrying it, in insertion order.
/// A unique index refuses a second record under an existing key instead of
/// overwriting the first.
///
/// # Example
///
/// ```rust
/// use enumdb_core::{HashIndex, Record};
/// use std::sync::Arc;
///
/// let mut index: HashIndex<String> = HashIndex::unique("name");
/// let red = Arc::new(Record::new(1).with("name", "red"));
///
/// index.insert("red".to_string(), Arc::clone(&red)).unwrap();
/// assert!(Arc::ptr_eq(index.get(&"red".to_string()).unwrap(), &red));
///
/// let clash = Arc::new(Record::new(2).with("name", "red"));
/// assert!(index.insert("red".to_string(), clash).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct HashIndex<K> {
    /// Indexed attribute.
    name: String,
    /// Whether keys must be unique.
    unique: bool,
    /// Key to records mapping.
    entries: HashMap<K, Vec<Arc<Record>>>,
    /// Total entry count.
    count: usize,
}

/// A unique index already holds a different record under the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCollision {
    /// Record already indexed under the key.
    pub existing: RecordId,
    /// Record that was refused.
    pub incoming: RecordId,
}

impl<K: Hash + Eq> HashIndex<K> {
    /// Creates a non-unique index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            entries: HashMap::new(),
            count: 0,
        }
    }

    /// Creates a unique index.
    pub fn unique(name: impl Into<String>) -> Self {
        Self {
            unique: true,
            ..Self::new(name)
        }
    }

    /// Indexed attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether keys must be unique.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Adds a record under `key`.
    ///
    /// Re-inserting the same record id under a key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `IndexCollision` if the index is unique and another record
    /// already holds the key.
    pub fn insert(&mut self, key: K, record: Arc<Record>) -> Result<(), IndexCollision> {
        let records = self.entries.entry(key).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Ok(());
        }
        if self.unique {
            if let Some(existing) = records.first() {
                return Err(IndexCollision {
                    existing: existing.id,
                    incoming: record.id,
                });
            }
        }
        records.push(record);
        self.count += 1;
        Ok(())
    }

    /// Removes the record with `id` from under `key`.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, key: &K, id: RecordId) -> bool {
        if let Some(records) = self.entries.get_mut(key) {
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() < before {
                self.count -= before - records.len();
                if records.is_empty() {
                    self.entries.remove(key);
                }
                return true;
            }
        }
        false
    }

    /// First record indexed under `key`.
    pub fn get(&self, key: &K) -> Option<&Arc<Record>> {
        self.entries.get(key).and_then(|records| records.first())
    }

    /// All records indexed under `key`, in insertion order.
    pub fn get_all(&self, key: &K) -> &[Arc<Record>] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Whether any record is indexed under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of (key, record) entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: RecordId) -> Arc<Record> {
        Arc::new(Record::new(id))
    }

    #[test]
    fn insert_and_lookup() {
        let mut index = HashIndex::new("name");
        let red = record(1);

        index.insert("red".to_string(), Arc::clone(&red)).unwrap();

        let found = index.get_all(&"red".to_string());
        assert_eq!(found.len(), 1);
        assert!(Arc::ptr_eq(&found[0], &red));
    }

    #[test]
    fn lookup_missing() {
        let index: HashIndex<String> = HashIndex::new("name");

        assert!(index.get(&"missing".to_string()).is_none());
        assert!(index.get_all(&"missing".to_string()).is_empty());
    }

    #[test]
    fn multiple_records_same_key_keep_order() {
        let mut index = HashIndex::new("html");

        index.insert("#f00".to_string(), record(2)).unwrap();
        index.insert("#f00".to_string(), record(1)).unwrap();

        let ids: Vec<_> = index.get_all(&"#f00".to_string()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(index.get(&"#f00".to_string()).unwrap().id, 2);
        assert_eq!(index.len(), 2);
        assert_eq!(index.key_count(), 1);
    }

    #[test]
    fn remove_entry() {
        let mut index = HashIndex::new("name");

        index.insert("key".to_string(), record(1)).unwrap();
        assert!(index.contains(&"key".to_string()));

        assert!(index.remove(&"key".to_string(), 1));
        assert!(!index.contains(&"key".to_string()));
        assert!(index.is_empty());
        assert!(!index.remove(&"key".to_string(), 1));
    }

    #[test]
    fn remove_one_of_many() {
        let mut index = HashIndex::new("name");

        index.insert("key".to_string(), record(1)).unwrap();
        index.insert("key".to_string(), record(2)).unwrap();
        index.remove(&"key".to_string(), 1);

        let found = index.get_all(&"key".to_string());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[test]
    fn unique_index_prevents_duplicates() {
        let mut index = HashIndex::unique("name");

        index.insert("key".to_string(), record(1)).unwrap();
        let err = index.insert("key".to_string(), record(2)).unwrap_err();

        assert_eq!(err, IndexCollision { existing: 1, incoming: 2 });
        assert_eq!(index.get(&"key".to_string()).unwrap().id, 1);
    }

    #[test]
    fn unique_index_allows_reinsert_of_same_record() {
        let mut index = HashIndex::unique("name");

        index.insert("key".to_string(), record(1)).unwrap();
        index.insert("key".to_string(), record(1)).unwrap();

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn clear_empties_index() {
        let mut index = HashIndex::new("name");
        index.insert(1i64, record(1)).unwrap();
        index.insert(2i64, record(2)).unwrap();

        index.clear();

        assert!(index.is_empty());
        assert!(!index.contains(&1));
    }
}

//! Prefix index for multi-attribute enumerators.
//!
//! An enumeration identified by `(controller, action)` can be looked up by
//! the full tuple or by any leading part of it:
//!
//! ```rust
//! use enumdb_core::{Atom, PrefixIndex, Record};
//! use std::sync::Arc;
//!
//! let mut index = PrefixIndex::new("controller, action", 2);
//! let key = |c: &str, a: &str| vec![Atom::Str(c.into()), Atom::Str(a.into())];
//!
//! index.insert(key("users", "index"), Arc::new(Record::new(1))).unwrap();
//! index.insert(key("users", "new"), Arc::new(Record::new(2))).unwrap();
//!
//! assert_eq!(index.lookup(&[Atom::Str("users".into())]).unwrap().id, 1);
//! assert_eq!(index.lookup(&key("users", "new")).unwrap().id, 2);
//! ```
//!
//! Each prefix length has its own hash index, so a partial key resolves in
//! O(1) to the first record in insertion order that starts with it. Only
//! the full tuple is unique.

use crate::index::hash::{HashIndex, IndexCollision};
use crate::normalize::Atom;
use enumdb_store::{Record, RecordId};
use std::sync::Arc;

/// Index over every prefix of an enumerator tuple.
#[derive(Debug, Clone)]
pub struct PrefixIndex {
    /// `levels[n]` is keyed by the first `n + 1` components.
    levels: Vec<HashIndex<Vec<Atom>>>,
}

impl PrefixIndex {
    /// Creates an index over tuples of `arity` components.
    pub fn new(name: &str, arity: usize) -> Self {
        let arity = arity.max(1);
        let levels = (1..=arity)
            .map(|len| {
                if len == arity {
                    HashIndex::unique(name)
                } else {
                    HashIndex::new(name)
                }
            })
            .collect();
        Self { levels }
    }

    /// Number of components in a full key.
    pub fn arity(&self) -> usize {
        self.levels.len()
    }

    /// Indexes a record under its full tuple and every prefix of it.
    ///
    /// # Errors
    ///
    /// Returns `IndexCollision` if another record has the same full tuple.
    /// The index is left unchanged in that case.
    pub fn insert(&mut self, tuple: Vec<Atom>, record: Arc<Record>) -> Result<(), IndexCollision> {
        let full = self.arity();
        if tuple.len() == full {
            if let Some(existing) = self.levels[full - 1].get(&tuple) {
                if existing.id != record.id {
                    return Err(IndexCollision {
                        existing: existing.id,
                        incoming: record.id,
                    });
                }
            }
        }
        for (len, level) in self.levels.iter_mut().enumerate().take(tuple.len()) {
            level.insert(tuple[..=len].to_vec(), Arc::clone(&record))?;
        }
        Ok(())
    }

    /// Removes a record from under its tuple and every prefix.
    pub fn remove(&mut self, tuple: &[Atom], id: RecordId) -> bool {
        let mut removed = false;
        for (len, level) in self.levels.iter_mut().enumerate().take(tuple.len()) {
            removed |= level.remove(&tuple[..=len].to_vec(), id);
        }
        removed
    }

    /// First record whose tuple starts with `prefix`.
    pub fn lookup(&self, prefix: &[Atom]) -> Option<&Arc<Record>> {
        if prefix.is_empty() {
            return None;
        }
        self.levels.get(prefix.len() - 1)?.get(&prefix.to_vec())
    }

    /// Every record whose tuple starts with `prefix`, in insertion order.
    pub fn lookup_all(&self, prefix: &[Atom]) -> &[Arc<Record>] {
        match prefix.len().checked_sub(1).and_then(|level| self.levels.get(level)) {
            Some(level) => level.get_all(&prefix.to_vec()),
            None => &[],
        }
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.levels.last().map_or(0, HashIndex::len)
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

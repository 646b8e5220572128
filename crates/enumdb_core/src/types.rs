//! Core type definitions for enumdb.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version number of a published snapshot.
///
/// Every full load and every incremental update publishes a snapshot with
/// a higher generation than the one it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// Creates a new generation.
    #[must_use]
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Returns the raw generation value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen:{}", self.0)
    }
}

/// What a lookup does when no record matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissPolicy {
    /// Every miss is a `RecordNotFound` error, including nil keys.
    #[default]
    Raise,
    /// Nil keys miss silently; typed keys (ids, names, tuples) raise.
    RaiseOnlyForTypedKeys,
    /// Misses are reported as `None`, never as errors.
    Silent,
}

/// Single-record cache patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    /// Add the record, or replace the record with the same id.
    Push,
    /// Remove the record with the same id.
    Delete,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOp::Push => f.write_str("push"),
            CacheOp::Delete => f.write_str("delete"),
        }
    }
}

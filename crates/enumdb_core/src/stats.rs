//! Cache statistics.
//!
//! Every [`crate::EnumerationCache`] keeps a set of counters that can be
//! read while lookups are in flight.
//!
//! ```rust,ignore
//! let stats = cache.stats().snapshot();
//! println!("loads: {} hits: {} misses: {}", stats.loads, stats.hits, stats.misses);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Full snapshot loads from the store.
    loads: AtomicU64,
    /// Snapshot reads served from the cache.
    hits: AtomicU64,
    /// Lookups that matched no record.
    misses: AtomicU64,
    /// Explicit invalidations.
    invalidations: AtomicU64,
    /// Single-record patches applied.
    incremental_updates: AtomicU64,
    /// Writes rejected by the modification guard.
    rejected_modifications: AtomicU64,
    /// Completed bootstrap runs.
    bootstraps: AtomicU64,
}

impl CacheStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_incremental_update(&self) {
        self.incremental_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_modification(&self) {
        self.rejected_modifications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bootstrap(&self) {
        self.bootstraps.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of full loads from the store.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Returns the number of snapshot reads served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of lookups that matched nothing.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of invalidations.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Returns the number of incremental updates.
    pub fn incremental_updates(&self) -> u64 {
        self.incremental_updates.load(Ordering::Relaxed)
    }

    /// Returns the number of rejected modifications.
    pub fn rejected_modifications(&self) -> u64 {
        self.rejected_modifications.load(Ordering::Relaxed)
    }

    /// Returns the number of completed bootstraps.
    pub fn bootstraps(&self) -> u64 {
        self.bootstraps.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            loads: self.loads(),
            hits: self.hits(),
            misses: self.misses(),
            invalidations: self.invalidations(),
            incremental_updates: self.incremental_updates(),
            rejected_modifications: self.rejected_modifications(),
            bootstraps: self.bootstraps(),
        }
    }
}

/// A point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Full loads from the store.
    pub loads: u64,
    /// Snapshot reads served from the cache.
    pub hits: u64,
    /// Lookups that matched nothing.
    pub misses: u64,
    /// Explicit invalidations.
    pub invalidations: u64,
    /// Single-record patches.
    pub incremental_updates: u64,
    /// Rejected modifications.
    pub rejected_modifications: u64,
    /// Completed bootstraps.
    pub bootstraps: u64,
}

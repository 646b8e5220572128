//! Benchmark utilities.

use enumdb_core::{AttributeSpec, Config, EnumerationCache, EnumerationType, Record, RecordId};
use enumdb_store::InMemoryStore;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

/// Enumerator value of the benchmark record with `id`.
pub fn name_of(id: RecordId) -> String {
    format!("Status {id}!")
}

/// Generate `count` records with a unique `code` and a non-unique `group`.
pub fn generate_records(count: usize) -> Vec<Record> {
    let mut rng = rand::thread_rng();
    (1..=count as RecordId)
        .map(|id| {
            Record::new(id)
                .with("name", name_of(id))
                .with("code", format!("S{id:05}"))
                .with("group", rng.gen_range(0..16i64))
        })
        .collect()
}

/// The `Status` benchmark type: aliases on, unique `code`, grouped.
pub fn status_type() -> EnumerationType {
    EnumerationType::new("Status")
        .collection("statuses")
        .safe_aliases(true)
        .updates_permitted(true)
        .index(AttributeSpec::new("code").unique())
        .index(AttributeSpec::new("group"))
}

/// Create a `Status` cache over an in-memory store with `count` records.
pub fn status_cache(count: usize) -> (Arc<InMemoryStore>, EnumerationCache) {
    let store = Arc::new(InMemoryStore::with_records("statuses", generate_records(count)));
    let cache = EnumerationCache::new(status_type(), store.clone(), Config::default())
        .expect("Failed to create benchmark cache");
    (store, cache)
}

/// Generate `count` existing ids in random order.
pub fn shuffled_ids(records: usize, count: usize) -> Vec<RecordId> {
    let mut rng = rand::thread_rng();
    let mut ids: Vec<RecordId> = (0..count).map(|i| (i % records) as RecordId + 1).collect();
    ids.shuffle(&mut rng);
    ids
}

//! Stress tests for enumeration caches.
//!
//! These helpers drive a cache under heavy read load, with invalidations
//! and incremental updates racing the readers.

use enumdb_core::{CacheOp, Config, EnumerationCache, EnumerationType, Record, RecordId};
use enumdb_store::InMemoryStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of lookups to perform, across all reader threads.
    pub operations: usize,
    /// Number of concurrent reader threads.
    pub threads: usize,
    /// Number of records in the enumeration.
    pub record_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            record_count: 100,
        }
    }
}

/// The enumerator value of the stress record with `id`.
pub fn stress_name(id: RecordId) -> String {
    format!("level-{id}")
}

/// Builds `count` records of the `Level` stress enumeration.
pub fn stress_records(count: usize) -> Vec<Record> {
    (1..=count as RecordId)
        .map(|id| Record::new(id).with("name", stress_name(id)).with("weight", id * 10))
        .collect()
}

/// Creates a `Level` cache over an in-memory store holding `count` records.
///
/// The type permits updates so the incremental stress can patch it.
pub fn stress_cache(count: usize) -> (Arc<InMemoryStore>, Arc<EnumerationCache>) {
    let store = Arc::new(InMemoryStore::with_records("levels", stress_records(count)));
    let cache = EnumerationCache::new(
        EnumerationType::new("Level").updates_permitted(true),
        store.clone(),
        Config::default(),
    )
    .expect("Failed to create stress cache");
    (store, Arc::new(cache))
}

/// Resolves the `i`th lookup, alternating between id and name keys.
///
/// Succeeds only if the record is found and carries the expected id.
fn lookup(cache: &EnumerationCache, i: usize, record_count: usize) -> bool {
    let id = (i % record_count) as RecordId + 1;
    let resolver = cache.resolver();
    let found = if i % 2 == 0 {
        resolver.resolve(id)
    } else {
        resolver.resolve(stress_name(id))
    };
    matches!(found, Ok(Some(record)) if record.id == id)
}

/// Runs lookups from a single thread.
pub fn stress_sequential_lookups(cache: &EnumerationCache, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        if lookup(cache, i, config.record_count) {
            successful += 1;
        } else {
            failed += 1;
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Runs lookups from `config.threads` threads while `background` runs
/// repeatedly on one extra thread until the readers finish.
fn run_readers<F>(cache: Arc<EnumerationCache>, config: &StressConfig, background: F) -> StressTestResult
where
    F: Fn(&EnumerationCache, usize) + Send + 'static,
{
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let ops_per_thread = config.operations / config.threads.max(1);
    let record_count = config.record_count;

    let start = Instant::now();

    let churn = {
        let cache = Arc::clone(&cache);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut round = 0usize;
            while !done.load(Ordering::Acquire) {
                background(&cache, round);
                round += 1;
                thread::yield_now();
            }
        })
    };

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    if lookup(&cache, t * ops_per_thread + i, record_count) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    done.store(true, Ordering::Release);
    churn.join().expect("Thread panicked");

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs concurrent lookups with nothing else touching the cache.
pub fn stress_concurrent_lookups(cache: Arc<EnumerationCache>, config: &StressConfig) -> StressTestResult {
    run_readers(cache, config, |_, _| thread::sleep(Duration::from_millis(1)))
}

/// Runs concurrent lookups while another thread keeps invalidating.
pub fn stress_lookups_with_invalidation(
    cache: Arc<EnumerationCache>,
    config: &StressConfig,
) -> StressTestResult {
    run_readers(cache, config, |cache, _| cache.invalidate())
}

/// Runs concurrent lookups while another thread keeps replacing records
/// through incremental updates.
///
/// Replacements keep each record's id and name, so every lookup must still
/// succeed.
pub fn stress_lookups_with_incremental_updates(
    cache: Arc<EnumerationCache>,
    config: &StressConfig,
) -> StressTestResult {
    let record_count = config.record_count;
    run_readers(cache, config, move |cache, round| {
        let id = (round % record_count) as RecordId + 1;
        let record = Record::new(id)
            .with("name", stress_name(id))
            .with("weight", (round as i64) * 10);
        // The cache may be empty or mid-reload; both leave it consistent.
        let _ = cache.update_incremental(CacheOp::Push, record);
    })
}

//! Per-type snapshot cache.

use crate::config::Config;
use crate::error::{describe_ids, CoreError, CoreResult};
use crate::index::{IndexBuilder, Indexes};
use crate::normalize::{Atom, IntoKey, KeyNormalizer, Lookup};
use crate::resolver::LookupResolver;
use crate::schema::EnumerationType;
use crate::stats::CacheStats;
use crate::types::{CacheOp, Generation};
use enumdb_store::{Record, RecordId, RecordStore, StoreError};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The full, immutable record set of one enumeration plus its indexes.
///
/// Snapshots are shared behind an `Arc`. Two calls to
/// [`EnumerationCache::all`] with no invalidation in between return the
/// same snapshot, and every record in it is the same `Arc<Record>` the
/// indexes hand out.
#[derive(Debug)]
pub struct Snapshot {
    records: Vec<Arc<Record>>,
    indexes: Indexes,
    generation: Generation,
}

impl Snapshot {
    /// Records in snapshot order.
    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the enumeration has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records in snapshot order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Record>> {
        self.records.iter()
    }

    /// Record with the given id.
    pub fn get(&self, id: RecordId) -> Option<&Arc<Record>> {
        self.indexes.by_id(id)
    }

    /// Indexes built over this snapshot.
    pub fn indexes(&self) -> &Indexes {
        &self.indexes
    }

    /// Version of this snapshot.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Arc<Record>;
    type IntoIter = std::slice::Iter<'a, Arc<Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Owns the snapshot and indexes of one enumeration type.
///
/// `EnumerationCache` is the concurrency boundary for an enumeration:
/// - Readers share the published snapshot and never see a partial rebuild
/// - A cold cache is loaded by at most one thread at a time (single flight)
/// - No lock protecting the snapshot is held across store I/O
/// - Writes are rejected unless the type permits them or an
///   [`UpdatePermit`] is active
///
/// # States
///
/// A cache is either empty or loaded. The first read loads it,
/// [`invalidate`](Self::invalidate) empties it, and
/// [`update_incremental`](Self::update_incremental) replaces a loaded
/// snapshot with a patched one.
///
/// # Example
///
/// ```rust
/// use enumdb_core::{Config, EnumerationCache, EnumerationType, Record};
/// use enumdb_store::InMemoryStore;
/// use std::sync::Arc;
///
/// let store = InMemoryStore::with_records(
///     "colors",
///     vec![Record::new(1).with("name", "red")],
/// );
/// let cache = EnumerationCache::new(
///     EnumerationType::new("Color"),
///     Arc::new(store),
///     Config::default(),
/// )
/// .unwrap();
///
/// let red = cache.find_by_attribute("name", "red").unwrap().unwrap();
/// assert!(Arc::ptr_eq(&red, &cache.find_by_id(1).unwrap().unwrap()));
/// ```
pub struct EnumerationCache {
    kind: EnumerationType,
    store: Arc<dyn RecordStore>,
    config: Config,
    /// Published snapshot; `None` while empty.
    state: RwLock<Option<Arc<Snapshot>>>,
    /// Held by every thread that publishes a snapshot.
    load_lock: Mutex<()>,
    /// Bumped by every invalidation, under the state write lock.
    epoch: AtomicU64,
    generation: AtomicU64,
    bypass: AtomicUsize,
    permits: AtomicUsize,
    stats: CacheStats,
}

impl EnumerationCache {
    /// Creates an empty cache for `kind` over `store`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the declaration is malformed (no
    /// enumerator, an attribute indexed twice, or `id` declared as an
    /// attribute).
    pub fn new(kind: EnumerationType, store: Arc<dyn RecordStore>, config: Config) -> CoreResult<Self> {
        kind.check().map_err(CoreError::invalid_operation)?;
        Ok(Self {
            kind,
            store,
            config,
            state: RwLock::new(None),
            load_lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            bypass: AtomicUsize::new(0),
            permits: AtomicUsize::new(0),
            stats: CacheStats::new(),
        })
    }

    /// The enumeration this cache serves.
    pub fn enumeration(&self) -> &EnumerationType {
        &self.kind
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Cache counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Whether a snapshot is currently published.
    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }

    /// Whether reads are served from the published snapshot.
    ///
    /// False when caching is switched off globally, for this type, or by an
    /// active [`CacheBypass`].
    pub fn is_caching(&self) -> bool {
        self.config.perform_caching && self.kind.caches() && self.bypass.load(Ordering::SeqCst) == 0
    }

    /// Returns the current snapshot, loading it on first use.
    ///
    /// While caching is off every call reads the store and returns a fresh,
    /// unpublished snapshot.
    ///
    /// # Errors
    ///
    /// Returns store errors unchanged, and `IndexIntegrityViolation` if the
    /// stored records can't be indexed.
    pub fn all(&self) -> CoreResult<Arc<Snapshot>> {
        if !self.is_caching() {
            return self.load().map(Arc::new);
        }

        if let Some(snapshot) = self.published() {
            self.stats.record_hit();
            return Ok(snapshot);
        }

        let _flight = self.load_lock.lock();
        // Another thread may have finished loading while we waited.
        if let Some(snapshot) = self.published() {
            self.stats.record_hit();
            return Ok(snapshot);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let snapshot = Arc::new(self.load()?);
        self.publish(epoch, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    pub fn count(&self) -> CoreResult<usize> {
        Ok(self.all()?.len())
    }

    /// Record with the given id, if any.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    pub fn find_by_id(&self, id: RecordId) -> CoreResult<Option<Arc<Record>>> {
        self.lookup(&Lookup::Id(id))
    }

    /// Records with the given ids, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` listing every id that matched nothing.
    pub fn find_some(&self, ids: &[RecordId]) -> CoreResult<Vec<Arc<Record>>> {
        let snapshot = self.all()?;
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        for &id in ids {
            match snapshot.get(id) {
                Some(record) => found.push(Arc::clone(record)),
                None => missing.push(id),
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            self.stats.record_miss();
            Err(CoreError::record_not_found(self.kind.name(), describe_ids(&missing)))
        }
    }

    /// First record whose `attribute` equals `key`.
    ///
    /// `id` is always queryable; other attributes must be the enumerator or
    /// a declared index. Safe aliases apply where the index has them.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` for an unindexed attribute and
    /// `InvalidKeyType` for an unusable key.
    pub fn find_by_attribute(&self, attribute: &str, key: impl IntoKey) -> CoreResult<Option<Arc<Record>>> {
        Ok(self.find_all_by_attribute(attribute, key)?.into_iter().next())
    }

    /// Every record whose `attribute` equals `key`, in snapshot order.
    ///
    /// # Errors
    ///
    /// See [`find_by_attribute`](Self::find_by_attribute).
    pub fn find_all_by_attribute(&self, attribute: &str, key: impl IntoKey) -> CoreResult<Vec<Arc<Record>>> {
        let key = key
            .into_key()
            .map_err(|e| CoreError::invalid_key_type(self.kind.name(), e.type_name))?;
        let atom = KeyNormalizer::atom(&key)
            .map_err(|e| CoreError::invalid_key_type(self.kind.name(), e.type_name))?;

        let snapshot = self.all()?;
        let found = match (attribute, atom) {
            (_, None) => Vec::new(),
            ("id", Some(Atom::Int(id))) => snapshot.get(id).cloned().into_iter().collect(),
            ("id", Some(_)) => Vec::new(),
            (name, Some(atom)) => {
                let index = snapshot.indexes().attribute(name).ok_or_else(|| CoreError::UnknownAttribute {
                    enumeration: self.kind.name().to_string(),
                    attribute: name.to_string(),
                })?;
                index.find(&atom).to_vec()
            }
        };

        if found.is_empty() {
            self.stats.record_miss();
        }
        Ok(found)
    }

    /// Drops the published snapshot; the next read reloads from the store.
    ///
    /// Safe to call at any time. A load racing with an invalidation never
    /// publishes its (possibly stale) result.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if state.take().is_some() {
            debug!(enumeration = %self.kind.name(), "snapshot invalidated");
        }
        self.stats.record_invalidation();
    }

    /// Patches the published snapshot for one record instead of reloading.
    ///
    /// `Push` adds or replaces the record, `Delete` removes the record with
    /// its id. The result is what a full reload would produce once the store
    /// reflects the same change. An empty cache is left empty.
    ///
    /// # Errors
    ///
    /// Returns `ModificationNotPermitted` outside a permitted scope and
    /// `IndexIntegrityViolation` if the record collides with another.
    pub fn update_incremental(&self, op: CacheOp, record: Record) -> CoreResult<()> {
        self.guard_write("update_incremental")?;
        self.apply(op, record)
    }

    /// Creates a record through the store.
    ///
    /// # Errors
    ///
    /// Returns `ModificationNotPermitted` outside a permitted scope,
    /// `RecordInvalid` if the record fails validation or collides with an
    /// existing one, and store errors unchanged.
    pub fn create(&self, record: Record) -> CoreResult<Record> {
        self.guard_write("create")?;
        self.validate_write(&record, None)?;

        let created = self
            .store
            .create(self.kind.collection_name(), record.clone())
            .map_err(|e| self.write_error(e, &record))?;
        self.after_write(CacheOp::Push, created.clone())?;
        Ok(created)
    }

    /// Replaces a record through the store.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create), plus `RecordNotFound` if no record has
    /// the id.
    pub fn update(&self, record: Record) -> CoreResult<Record> {
        self.guard_write("update")?;
        let snapshot = self.all()?;
        let existing = snapshot
            .get(record.id)
            .ok_or_else(|| CoreError::record_not_found(self.kind.name(), record.id.to_string()))?;
        self.validate_write(&record, Some(existing))?;

        let updated = self
            .store
            .update(self.kind.collection_name(), record.clone())
            .map_err(|e| self.write_error(e, &record))?;
        self.after_write(CacheOp::Push, updated.clone())?;
        Ok(updated)
    }

    /// Deletes a record through the store.
    ///
    /// # Errors
    ///
    /// Returns `ModificationNotPermitted` outside a permitted scope and
    /// `RecordNotFound` if no record has the id.
    pub fn destroy(&self, id: RecordId) -> CoreResult<()> {
        self.guard_write("destroy")?;
        self.store
            .delete(self.kind.collection_name(), id)
            .map_err(|e| match e {
                StoreError::NotFound { .. } => CoreError::record_not_found(self.kind.name(), id.to_string()),
                other => other.into(),
            })?;
        self.after_write(CacheOp::Delete, Record::new(id))
    }

    /// Disables caching for this type until the guard is dropped.
    ///
    /// Guards nest; caching resumes when the last one is dropped.
    #[must_use = "caching resumes as soon as the guard is dropped"]
    pub fn uncached(&self) -> CacheBypass<'_> {
        self.bypass.fetch_add(1, Ordering::SeqCst);
        CacheBypass { cache: self }
    }

    /// Permits writes to this type until the guard is dropped.
    #[must_use = "writes are rejected again as soon as the guard is dropped"]
    pub fn permit_updates(&self) -> UpdatePermit<'_> {
        self.permits.fetch_add(1, Ordering::SeqCst);
        UpdatePermit { cache: self }
    }

    /// Whether writes are currently permitted.
    pub fn updates_permitted(&self) -> bool {
        self.kind.allows_updates() || self.permits.load(Ordering::SeqCst) > 0
    }

    /// Key-based lookups with this type's miss policy.
    pub fn resolver(&self) -> LookupResolver<'_> {
        LookupResolver::new(self)
    }

    /// Dispatches a normalized lookup to the matching index.
    pub(crate) fn lookup(&self, lookup: &Lookup) -> CoreResult<Option<Arc<Record>>> {
        let found = match lookup {
            Lookup::Nil => None,
            Lookup::Id(id) => self.all()?.get(*id).cloned(),
            Lookup::Enumerator(atoms) => self.all()?.indexes().lookup_enumerator(atoms).cloned(),
        };
        if found.is_none() {
            self.stats.record_miss();
            debug!(enumeration = %self.kind.name(), lookup = ?lookup, "lookup missed");
        }
        Ok(found)
    }

    /// Maps a store write failure onto the core taxonomy.
    pub(crate) fn write_error(&self, err: StoreError, record: &Record) -> CoreError {
        match err {
            StoreError::Validation { message, .. } => {
                CoreError::record_invalid(self.kind.name(), record.clone(), message)
            }
            other => other.into(),
        }
    }

    fn published(&self) -> Option<Arc<Snapshot>> {
        self.state.read().clone()
    }

    fn publish(&self, epoch: u64, snapshot: Arc<Snapshot>) -> bool {
        let mut state = self.state.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(enumeration = %self.kind.name(), "discarding snapshot loaded across an invalidation");
            return false;
        }
        *state = Some(snapshot);
        true
    }

    fn next_generation(&self) -> Generation {
        Generation::new(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Reads the collection and indexes it. Never touches `state`.
    fn load(&self) -> CoreResult<Snapshot> {
        let records = self.store.list(self.kind.collection_name())?;
        self.stats.record_load();

        let records = records.into_iter().map(Arc::new).collect();
        let snapshot = self.index(records)?;
        debug!(
            enumeration = %self.kind.name(),
            records = snapshot.len(),
            generation = %snapshot.generation,
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    fn index(&self, mut records: Vec<Arc<Record>>) -> CoreResult<Snapshot> {
        self.kind.sort(&mut records);
        let indexes = IndexBuilder::new(&self.kind, &self.config).build(&records)?;
        Ok(Snapshot {
            records,
            indexes,
            generation: self.next_generation(),
        })
    }

    fn apply(&self, op: CacheOp, record: Record) -> CoreResult<()> {
        let _flight = self.load_lock.lock();
        let epoch = self.epoch.load(Ordering::SeqCst);
        let Some(current) = self.published() else {
            debug!(enumeration = %self.kind.name(), %op, id = record.id, "cache empty, nothing to patch");
            return Ok(());
        };

        let Some(next) = self.patch(&current, op, record)? else {
            return Ok(());
        };
        let generation = next.generation;
        if self.publish(epoch, Arc::new(next)) {
            self.stats.record_incremental_update();
            debug!(enumeration = %self.kind.name(), %op, %generation, "snapshot patched");
        }
        Ok(())
    }

    fn patch(&self, current: &Snapshot, op: CacheOp, record: Record) -> CoreResult<Option<Snapshot>> {
        let position = current.records.iter().position(|r| r.id == record.id);
        match op {
            CacheOp::Push => {
                let record = Arc::new(record);
                let mut records = current.records.clone();
                match position {
                    None if self.kind.ordering().is_none() => {
                        let indexes = current.indexes.push(Arc::clone(&record))?;
                        records.push(record);
                        Ok(Some(Snapshot {
                            records,
                            indexes,
                            generation: self.next_generation(),
                        }))
                    }
                    None => {
                        records.push(record);
                        self.index(records).map(Some)
                    }
                    Some(i) => {
                        records[i] = record;
                        self.index(records).map(Some)
                    }
                }
            }
            CacheOp::Delete => {
                let Some(i) = position else {
                    return Ok(None);
                };
                let mut records = current.records.clone();
                let removed = records.remove(i);
                Ok(Some(Snapshot {
                    records,
                    indexes: current.indexes.remove(&removed),
                    generation: self.next_generation(),
                }))
            }
        }
    }

    fn after_write(&self, op: CacheOp, record: Record) -> CoreResult<()> {
        if self.config.prefer_incremental {
            if let Err(err) = self.apply(op, record) {
                // The store already holds the write; fall back to a reload.
                warn!(enumeration = %self.kind.name(), error = %err, "incremental update failed, invalidating");
                self.invalidate();
            }
        } else {
            self.invalidate();
        }
        Ok(())
    }

    fn guard_write(&self, operation: &str) -> CoreResult<()> {
        if self.updates_permitted() {
            return Ok(());
        }
        self.stats.record_rejected_modification();
        warn!(enumeration = %self.kind.name(), operation, "rejected modification of enumeration records");
        Err(CoreError::modification_not_permitted(self.kind.name(), operation))
    }

    /// Model validation plus uniqueness against the current records.
    fn validate_write(&self, record: &Record, existing: Option<&Arc<Record>>) -> CoreResult<()> {
        let name = self.kind.name();
        self.kind
            .validate(record)
            .map_err(|message| CoreError::record_invalid(name, record.clone(), message))?;

        let snapshot = self.all()?;
        if existing.is_none() && snapshot.get(record.id).is_some() {
            return Err(CoreError::record_invalid(name, record.clone(), "id has already been taken"));
        }

        let indexes = match existing {
            Some(existing) => snapshot.indexes().remove(existing),
            None => snapshot.indexes().clone(),
        };
        match indexes.push(Arc::new(record.clone())) {
            Ok(_) => Ok(()),
            Err(CoreError::IndexIntegrityViolation { attribute, reason, .. }) => Err(CoreError::record_invalid(
                name,
                record.clone(),
                format!("{attribute} has already been taken ({reason})"),
            )),
            Err(other) => Err(other),
        }
    }
}

impl std::fmt::Debug for EnumerationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumerationCache")
            .field("enumeration", &self.kind.name())
            .field("loaded", &self.is_loaded())
            .field("caching", &self.is_caching())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`EnumerationCache::uncached`].
#[derive(Debug)]
pub struct CacheBypass<'a> {
    cache: &'a EnumerationCache,
}

impl Drop for CacheBypass<'_> {
    fn drop(&mut self) {
        self.cache.bypass.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Guard returned by [`EnumerationCache::permit_updates`].
#[derive(Debug)]
pub struct UpdatePermit<'a> {
    cache: &'a EnumerationCache,
}

impl Drop for UpdatePermit<'_> {
    fn drop(&mut self) {
        self.cache.permits.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeSpec;
    use enumdb_store::InMemoryStore;

    fn colors() -> Vec<Record> {
        vec![
            Record::new(1).with("name", "red").with("html", "#f00"),
            Record::new(2).with("name", "blue").with("html", "#00f"),
        ]
    }

    fn color_cache(config: Config) -> (Arc<InMemoryStore>, EnumerationCache) {
        let store = Arc::new(InMemoryStore::with_records("colors", colors()));
        let kind = EnumerationType::new("Color").index(AttributeSpec::new("html").unique());
        let cache = EnumerationCache::new(kind, store.clone(), config).unwrap();
        (store, cache)
    }

    #[test]
    fn lazy_load_and_referential_stability() {
        let (store, cache) = color_cache(Config::default());
        assert!(!cache.is_loaded());

        let first = cache.all().unwrap();
        let second = cache.all().unwrap();

        assert!(cache.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.list_calls(), 1);

        let by_id = cache.find_by_id(1).unwrap().unwrap();
        let by_name = cache.find_by_attribute("name", "red").unwrap().unwrap();
        assert!(Arc::ptr_eq(&by_id, &by_name));
        assert!(Arc::ptr_eq(&by_id, &first.records()[0]));
    }

    #[test]
    fn invalidation_clears_identity_not_data() {
        let (store, cache) = color_cache(Config::default());
        let before = cache.find_by_id(1).unwrap().unwrap();

        cache.invalidate();
        assert!(!cache.is_loaded());

        let after = cache.find_by_id(1).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
        assert_eq!(store.list_calls(), 2);
    }

    #[test]
    fn stale_until_invalidated() {
        let (store, cache) = color_cache(Config::default());
        cache.all().unwrap();

        store.put_raw("colors", Record::new(1).with("name", "crimson"));
        assert!(cache.find_by_attribute("name", "crimson").unwrap().is_none());

        cache.invalidate();
        assert_eq!(cache.find_by_attribute("name", "crimson").unwrap().unwrap().id, 1);
    }

    #[test]
    fn secondary_and_id_attributes() {
        let (_, cache) = color_cache(Config::default());
        assert_eq!(cache.find_by_attribute("html", "#00f").unwrap().unwrap().id, 2);
        assert_eq!(cache.find_by_attribute("id", 2).unwrap().unwrap().id, 2);
        assert!(cache.find_by_attribute("id", "2").unwrap().is_none());
        assert!(cache.find_by_attribute("name", None::<&str>).unwrap().is_none());

        let err = cache.find_by_attribute("rank", 1).unwrap_err();
        assert!(matches!(err, CoreError::UnknownAttribute { .. }));

        let err = cache.find_by_attribute("name", 1.5).unwrap_err();
        assert!(matches!(err, CoreError::InvalidKeyType { .. }));
    }

    #[test]
    fn find_some_preserves_order_and_reports_missing() {
        let (_, cache) = color_cache(Config::default());
        let ids: Vec<_> = cache.find_some(&[2, 1]).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let err = cache.find_some(&[1, 7, 9]).unwrap_err();
        assert_eq!(err.to_string(), "couldn't find Color identified by 7, 9");
    }

    #[test]
    fn count_and_stats() {
        let (_, cache) = color_cache(Config::default());
        assert_eq!(cache.count().unwrap(), 2);
        cache.find_by_id(5).unwrap();

        let stats = cache.stats().snapshot();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn caching_disabled_reads_through() {
        let (store, cache) = color_cache(Config::default().perform_caching(false));
        let first = cache.all().unwrap();
        let second = cache.all().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!cache.is_loaded());
        assert_eq!(store.list_calls(), 2);
    }

    #[test]
    fn uncached_guard_nests() {
        let (store, cache) = color_cache(Config::default());
        cache.all().unwrap();
        {
            let _outer = cache.uncached();
            {
                let _inner = cache.uncached();
                cache.all().unwrap();
            }
            assert!(!cache.is_caching());
            cache.all().unwrap();
        }
        assert!(cache.is_caching());
        cache.all().unwrap();
        assert_eq!(store.list_calls(), 3);
    }

    #[test]
    fn writes_need_permission() {
        let (store, cache) = color_cache(Config::default());
        let err = cache.create(Record::new(3).with("name", "green")).unwrap_err();
        assert!(matches!(err, CoreError::ModificationNotPermitted { .. }));
        assert!(matches!(
            cache.destroy(1).unwrap_err(),
            CoreError::ModificationNotPermitted { .. }
        ));
        assert!(matches!(
            cache.update_incremental(CacheOp::Delete, Record::new(1)).unwrap_err(),
            CoreError::ModificationNotPermitted { .. }
        ));
        assert_eq!(store.list("colors").unwrap().len(), 2);
        assert_eq!(cache.stats().rejected_modifications(), 3);

        let _permit = cache.permit_updates();
        cache.create(Record::new(3).with("name", "green")).unwrap();
        assert_eq!(cache.find_by_attribute("name", "green").unwrap().unwrap().id, 3);
    }

    #[test]
    fn permitted_types_accept_writes() {
        let store = Arc::new(InMemoryStore::new());
        let kind = EnumerationType::new("Color").updates_permitted(true);
        let cache = EnumerationCache::new(kind, store, Config::default()).unwrap();
        cache.create(Record::new(1).with("name", "red")).unwrap();
        assert_eq!(cache.count().unwrap(), 1);
    }

    #[test]
    fn create_rejects_collisions_and_blank_enumerators() {
        let (_, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();

        let err = cache.create(Record::new(3).with("name", "red")).unwrap_err();
        assert!(err.to_string().contains("name has already been taken"));
        assert_eq!(err.invalid_record().map(|r| r.id), Some(3));

        let err = cache.create(Record::new(1).with("name", "green")).unwrap_err();
        assert!(err.to_string().contains("id has already been taken"));

        let err = cache.create(Record::new(3)).unwrap_err();
        assert!(err.to_string().contains("name can't be blank"));

        let err = cache.create(Record::new(3).with("name", "green").with("html", "#f00")).unwrap_err();
        assert!(err.to_string().contains("html has already been taken"));

        assert_eq!(cache.find_by_attribute("name", "red").unwrap().unwrap().id, 1);
    }

    #[test]
    fn update_and_destroy_patch_incrementally() {
        let (store, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();
        let blue = cache.find_by_id(2).unwrap().unwrap();

        cache.update(Record::new(1).with("name", "crimson").with("html", "#f00")).unwrap();
        assert!(cache.find_by_attribute("name", "red").unwrap().is_none());
        assert_eq!(cache.find_by_attribute("name", "crimson").unwrap().unwrap().id, 1);
        // Untouched records keep their identity.
        assert!(Arc::ptr_eq(&blue, &cache.find_by_id(2).unwrap().unwrap()));

        cache.destroy(2).unwrap();
        assert!(cache.find_by_id(2).unwrap().is_none());
        assert_eq!(store.list_calls(), 1);
        assert_eq!(cache.stats().incremental_updates(), 2);

        let err = cache.destroy(2).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_keeps_own_unique_values() {
        let (_, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();
        cache.update(Record::new(1).with("name", "red").with("html", "#ff0000")).unwrap();
        assert_eq!(cache.find_by_attribute("html", "#ff0000").unwrap().unwrap().id, 1);

        let err = cache.update(Record::new(9).with("name", "x")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn writes_invalidate_when_not_incremental() {
        let (store, cache) = color_cache(Config::default().prefer_incremental(false));
        let _permit = cache.permit_updates();
        cache.all().unwrap();

        cache.create(Record::new(3).with("name", "green")).unwrap();
        assert!(!cache.is_loaded());
        assert_eq!(cache.count().unwrap(), 3);
        assert_eq!(store.list_calls(), 2);
    }

    #[test]
    fn store_validation_maps_to_record_invalid() {
        let (store, cache) = color_cache(Config::default());
        store.set_validator(Box::new(|_, _| Some("store says no".to_string())));
        let _permit = cache.permit_updates();

        let err = cache.create(Record::new(3).with("name", "green")).unwrap_err();
        assert!(matches!(err, CoreError::RecordInvalid { ref message, .. } if message == "store says no"));
    }

    #[test]
    fn incremental_on_empty_cache_is_noop() {
        let (store, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();
        cache
            .update_incremental(CacheOp::Push, Record::new(3).with("name", "green"))
            .unwrap();
        assert!(!cache.is_loaded());
        assert_eq!(store.list_calls(), 0);
    }

    #[test]
    fn incremental_push_matches_reload() {
        let (store, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();
        cache.all().unwrap();

        let green = Record::new(3).with("name", "green");
        store.put_raw("colors", green.clone());
        cache.update_incremental(CacheOp::Push, green).unwrap();
        let patched: Vec<Record> = cache.all().unwrap().iter().map(|r| (**r).clone()).collect();

        cache.invalidate();
        let reloaded: Vec<Record> = cache.all().unwrap().iter().map(|r| (**r).clone()).collect();
        assert_eq!(patched, reloaded);
    }

    #[test]
    fn incremental_push_respects_order() {
        let store = Arc::new(InMemoryStore::with_records(
            "books",
            vec![
                Record::new(1).with("title", "b").with("rank", 2),
                Record::new(2).with("title", "c").with("rank", 3),
            ],
        ));
        let kind = EnumerationType::new("Book").enumerate_by(["title"]).order_by("rank");
        let cache = EnumerationCache::new(kind, store, Config::default()).unwrap();
        let _permit = cache.permit_updates();

        cache.create(Record::new(3).with("title", "a").with("rank", 1)).unwrap();
        let ids: Vec<_> = cache.all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn incremental_collision_is_integrity_violation() {
        let (_, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();
        let before = cache.all().unwrap();

        let err = cache
            .update_incremental(CacheOp::Push, Record::new(3).with("name", "red"))
            .unwrap_err();
        assert!(matches!(err, CoreError::IndexIntegrityViolation { .. }));
        assert!(Arc::ptr_eq(&before, &cache.all().unwrap()));
    }

    #[test]
    fn generations_increase() {
        let (_, cache) = color_cache(Config::default());
        let _permit = cache.permit_updates();
        let first = cache.all().unwrap().generation();

        cache
            .update_incremental(CacheOp::Delete, Record::new(2))
            .unwrap();
        let second = cache.all().unwrap().generation();
        assert!(second > first);
    }

    #[test]
    fn malformed_declaration_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let kind = EnumerationType::new("Color").enumerate_by(Vec::<String>::new());
        assert!(EnumerationCache::new(kind, store, Config::default()).is_err());
    }

    #[test]
    fn integrity_violation_surfaces_on_load() {
        let store = Arc::new(InMemoryStore::with_records(
            "colors",
            vec![
                Record::new(1).with("name", "red"),
                Record::new(2).with("name", "red"),
            ],
        ));
        let cache = EnumerationCache::new(EnumerationType::new("Color"), store, Config::default()).unwrap();

        assert!(matches!(
            cache.all().unwrap_err(),
            CoreError::IndexIntegrityViolation { .. }
        ));
        assert!(!cache.is_loaded());
    }
}

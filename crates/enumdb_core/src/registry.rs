//! Registry of enumeration caches.

use crate::bootstrap::{Bootstrapper, DeclaredRecord};
use crate::cache::{EnumerationCache, Snapshot};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::normalize::IntoKey;
use crate::schema::EnumerationType;
use crate::types::CacheOp;
use enumdb_store::{Record, RecordStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owns one [`EnumerationCache`] per registered enumeration type.
///
/// The registry is the explicit, injectable home of per-type cache state:
/// construct one per store and pass it to whatever needs lookups. All
/// operations address a type by its name.
///
/// # Example
///
/// ```rust
/// use enumdb_core::{CacheOp, EnumerationRegistry, EnumerationType, Record};
/// use enumdb_store::InMemoryStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::with_records(
///     "colors",
///     vec![Record::new(1).with("name", "red")],
/// ));
/// let registry = EnumerationRegistry::new(store);
/// registry
///     .register(EnumerationType::new("Color").updates_permitted(true))
///     .unwrap();
///
/// assert!(registry.is_enumeration("Color"));
/// assert_eq!(registry.all("Color").unwrap().len(), 1);
///
/// registry
///     .update_incremental("Color", CacheOp::Push, Record::new(2).with("name", "blue"))
///     .unwrap();
/// assert_eq!(registry.resolve("Color", "blue").unwrap().unwrap().id, 2);
/// ```
pub struct EnumerationRegistry {
    store: Arc<dyn RecordStore>,
    config: Config,
    caches: RwLock<HashMap<String, Arc<EnumerationCache>>>,
}

impl EnumerationRegistry {
    /// Creates a registry over `store` with the default configuration.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(store, Config::default())
    }

    /// Creates a registry over `store` with the given configuration.
    pub fn with_config(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config,
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration every cache is created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers an enumeration type and returns its cache.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the name is taken or the declaration
    /// is malformed.
    pub fn register(&self, kind: EnumerationType) -> CoreResult<Arc<EnumerationCache>> {
        let mut caches = self.caches.write();
        if caches.contains_key(kind.name()) {
            return Err(CoreError::invalid_operation(format!(
                "enumeration {} is already registered",
                kind.name()
            )));
        }

        let name = kind.name().to_string();
        let cache = Arc::new(EnumerationCache::new(kind, Arc::clone(&self.store), self.config.clone())?);
        caches.insert(name.clone(), Arc::clone(&cache));
        debug!(enumeration = %name, "registered enumeration");
        Ok(cache)
    }

    /// The cache of a registered type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEnumeration` if no type has that name.
    pub fn get(&self, name: &str) -> CoreResult<Arc<EnumerationCache>> {
        self.caches
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::unknown_enumeration(name))
    }

    /// Whether a type with that name is registered.
    pub fn is_enumeration(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves a key with the type's miss policy.
    ///
    /// # Errors
    ///
    /// See [`LookupResolver::resolve`](crate::LookupResolver::resolve).
    pub fn resolve(&self, name: &str, key: impl IntoKey) -> CoreResult<Option<Arc<Record>>> {
        self.get(name)?.resolver().resolve(key)
    }

    /// The current snapshot of a type.
    ///
    /// # Errors
    ///
    /// See [`EnumerationCache::all`].
    pub fn all(&self, name: &str) -> CoreResult<Arc<Snapshot>> {
        self.get(name)?.all()
    }

    /// Invalidates one type's cache.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEnumeration` if no type has that name.
    pub fn invalidate(&self, name: &str) -> CoreResult<()> {
        self.get(name)?.invalidate();
        Ok(())
    }

    /// Invalidates every cache.
    pub fn invalidate_all(&self) {
        let caches: Vec<_> = self.caches.read().values().cloned().collect();
        for cache in caches {
            cache.invalidate();
        }
    }

    /// Patches one type's cache for a single record.
    ///
    /// # Errors
    ///
    /// See [`EnumerationCache::update_incremental`].
    pub fn update_incremental(&self, name: &str, op: CacheOp, record: Record) -> CoreResult<()> {
        self.get(name)?.update_incremental(op, record)
    }

    /// Reconciles a type's collection with a declared record list.
    ///
    /// # Errors
    ///
    /// See [`Bootstrapper::run`].
    pub fn bootstrap(&self, name: &str, declared: Vec<DeclaredRecord>) -> CoreResult<Vec<Record>> {
        let cache = self.get(name)?;
        Bootstrapper::new(&cache).run(declared)
    }
}

impl std::fmt::Debug for EnumerationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumerationRegistry")
            .field("enumerations", &self.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

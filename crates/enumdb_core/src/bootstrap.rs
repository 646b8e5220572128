//! Reconciling declared records against the store.
//!
//! Bootstrapping makes a collection hold exactly a declared list of
//! records. It is an administrative operation: it runs with writes
//! permitted and caching bypassed, and invalidates the cache when done.

use crate::cache::EnumerationCache;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexBuilder;
use crate::normalize::Atom;
use enumdb_store::{Attributes, Record, RecordId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// One authoritative record, as declared in code or a seed file.
///
/// `attributes` overwrite whatever is stored. `defaults` only fill
/// attributes whose stored value is blank, so edits made by an
/// administrator survive a re-bootstrap.
///
/// ```rust
/// use enumdb_core::DeclaredRecord;
///
/// let red: DeclaredRecord =
///     serde_json::from_str(r##"{"id": 1, "name": "red", "defaults": {"html": "#f00"}}"##).unwrap();
/// assert_eq!(red, DeclaredRecord::new(1).with("name", "red").with_default("html", "#f00"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredRecord {
    /// Record id. Required; a record without one fails the bootstrap.
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Attributes applied unconditionally.
    #[serde(flatten)]
    pub attributes: Attributes,
    /// Attributes applied only where the stored value is blank.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub defaults: Attributes,
}

impl DeclaredRecord {
    /// Declares a record with the given id.
    pub fn new(id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets a default.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Applies this declaration over the stored record, if any.
    fn merge(self, id: RecordId, existing: Option<&Record>) -> Record {
        let mut record = existing.cloned().unwrap_or_else(|| Record::new(id));
        for (name, value) in self.attributes {
            record.set(name, value);
        }
        for (name, value) in self.defaults {
            if record.value_of(&name).is_blank() {
                record.set(name, value);
            }
        }
        record
    }

    fn as_record(&self) -> Record {
        Record::with_attributes(self.id.unwrap_or_default(), self.attributes.clone())
    }
}

/// Runs a bootstrap against one enumeration cache.
///
/// 1. Every declaration is merged with the stored record of the same id
///    and validated (id present and unique, enumerator present, and no
///    collision on any unique index or safe alias) before anything is
///    written.
/// 2. Inside one write session, stored records not declared are deleted,
///    then each merged record is updated or created in declaration order.
/// 3. The cache is invalidated, whether or not the writes succeeded.
///
/// A store rejection stops the loop with `RecordInvalid`; records written
/// before it stay written.
#[derive(Debug)]
pub struct Bootstrapper<'a> {
    cache: &'a EnumerationCache,
}

impl<'a> Bootstrapper<'a> {
    /// Creates a bootstrapper for `cache`.
    pub fn new(cache: &'a EnumerationCache) -> Self {
        Self { cache }
    }

    /// Reconciles the store with `declared`.
    ///
    /// Returns the stored records in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `RecordInvalid` for a declaration that fails validation or
    /// is rejected by the store, and store errors unchanged.
    pub fn run(&self, declared: Vec<DeclaredRecord>) -> CoreResult<Vec<Record>> {
        let result = {
            let _permit = self.cache.permit_updates();
            let _bypass = self.cache.uncached();
            self.reconcile(declared)
        };
        self.cache.invalidate();
        self.cache.stats().record_bootstrap();
        result
    }

    fn reconcile(&self, declared: Vec<DeclaredRecord>) -> CoreResult<Vec<Record>> {
        let kind = self.cache.enumeration();
        let name = kind.name();
        let collection = kind.collection_name();

        let mut ids = HashSet::new();
        for declaration in &declared {
            let Some(id) = declaration.id else {
                return Err(CoreError::record_invalid(name, declaration.as_record(), "id is required"));
            };
            if !ids.insert(id) {
                return Err(CoreError::record_invalid(
                    name,
                    declaration.as_record(),
                    format!("id {id} is declared more than once"),
                ));
            }
        }

        let mut session = self.cache.store().write()?;
        let existing: HashMap<RecordId, Record> = session
            .list(collection)?
            .into_iter()
            .map(|record| (record.id, record))
            .collect();

        // Index the merged set as a load would, so nothing unloadable is written.
        let mut indexes = IndexBuilder::new(kind, self.cache.config()).empty();
        let mut merged = Vec::with_capacity(declared.len());
        for declaration in declared {
            let id = declaration.id.unwrap_or_default();
            let record = declaration.merge(id, existing.get(&id));

            kind.validate(&record)
                .map_err(|message| CoreError::record_invalid(name, record.clone(), message))?;
            let indexable = kind
                .enumerator_values(&record)
                .iter()
                .all(|value| Atom::from_value(value).is_some());
            if !indexable {
                return Err(CoreError::record_invalid(name, record, "enumerator value can't be indexed"));
            }
            match indexes.insert(&Arc::new(record.clone())) {
                Ok(()) => {}
                Err(CoreError::IndexIntegrityViolation { attribute, reason, .. }) => {
                    return Err(CoreError::record_invalid(
                        name,
                        record,
                        format!("{attribute} has already been taken ({reason})"),
                    ));
                }
                Err(other) => return Err(other),
            }
            merged.push(record);
        }

        let keep: Vec<RecordId> = merged.iter().map(|record| record.id).collect();
        let deleted = session.delete_except(collection, &keep)?;

        let mut created = 0usize;
        let mut reconciled = Vec::with_capacity(merged.len());
        for record in merged {
            let written = if existing.contains_key(&record.id) {
                session.update(collection, record.clone())
            } else {
                created += 1;
                session.create(collection, record.clone())
            };
            reconciled.push(written.map_err(|e| self.cache.write_error(e, &record))?);
        }
        session.finish()?;

        info!(
            enumeration = %name,
            records = reconciled.len(),
            created,
            updated = reconciled.len() - created,
            deleted,
            "bootstrap complete"
        );
        Ok(reconciled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::schema::EnumerationType;
    use crate::schema::AttributeSpec;
    use enumdb_store::{InMemoryStore, RecordStore};

    fn setup(records: Vec<Record>) -> (Arc<InMemoryStore>, EnumerationCache) {
        let store = Arc::new(InMemoryStore::with_records("colors", records));
        let cache = EnumerationCache::new(EnumerationType::new("Color"), store.clone(), Config::default()).unwrap();
        (store, cache)
    }

    fn declared() -> Vec<DeclaredRecord> {
        vec![
            DeclaredRecord::new(1).with("name", "red").with_default("html", "#ff0000"),
            DeclaredRecord::new(2).with("name", "blue"),
        ]
    }

    #[test]
    fn creates_updates_and_deletes_to_match() {
        let (store, cache) = setup(vec![
            Record::new(2).with("name", "navy").with("html", "#000080"),
            Record::new(5).with("name", "mauve"),
        ]);

        let records = Bootstrapper::new(&cache).run(declared()).unwrap();

        assert_eq!(
            records,
            vec![
                Record::new(1).with("name", "red").with("html", "#ff0000"),
                Record::new(2).with("name", "blue").with("html", "#000080"),
            ]
        );
        let mut stored = store.list("colors").unwrap();
        stored.sort_by_key(|r| r.id);
        assert_eq!(stored, records);
    }

    #[test]
    fn defaults_preserve_existing_values() {
        let (_, cache) = setup(vec![Record::new(1).with("name", "red").with("html", "#f00")]);
        let records = Bootstrapper::new(&cache).run(declared()).unwrap();
        assert_eq!(records[0].get("html"), Some(&Value::from("#f00")));
    }

    #[test]
    fn defaults_fill_blank_values() {
        let (_, cache) = setup(vec![Record::new(1).with("name", "red").with("html", "")]);
        let records = Bootstrapper::new(&cache).run(declared()).unwrap();
        assert_eq!(records[0].get("html"), Some(&Value::from("#ff0000")));
    }

    #[test]
    fn idempotent() {
        let (store, cache) = setup(vec![]);
        let first = Bootstrapper::new(&cache).run(declared()).unwrap();
        let stored_first = store.list("colors").unwrap();

        let second = Bootstrapper::new(&cache).run(declared()).unwrap();
        assert_eq!(first, second);
        assert_eq!(stored_first, store.list("colors").unwrap());
    }

    #[test]
    fn runs_without_type_permission_and_restores_guard() {
        let (_, cache) = setup(vec![]);
        Bootstrapper::new(&cache).run(declared()).unwrap();

        assert!(!cache.updates_permitted());
        assert!(cache.is_caching());
        assert!(!cache.is_loaded());
        assert_eq!(cache.stats().bootstraps(), 1);
    }

    #[test]
    fn invalidates_loaded_cache() {
        let (_, cache) = setup(vec![Record::new(1).with("name", "crimson")]);
        assert!(cache.resolver().resolve("crimson").is_ok());

        Bootstrapper::new(&cache).run(declared()).unwrap();
        assert_eq!(cache.resolver().resolve("red").unwrap().unwrap().id, 1);
        assert!(cache.resolver().resolve("crimson").is_err());
    }

    #[test]
    fn missing_id_fails_before_any_write() {
        let (store, cache) = setup(vec![Record::new(7).with("name", "mauve")]);
        let mut records = declared();
        records.push(DeclaredRecord::default().with("name", "green"));

        let err = Bootstrapper::new(&cache).run(records).unwrap_err();
        assert!(matches!(err, CoreError::RecordInvalid { ref message, .. } if message == "id is required"));
        assert_eq!(store.list("colors").unwrap(), vec![Record::new(7).with("name", "mauve")]);
    }

    #[test]
    fn duplicate_declarations_fail_before_any_write() {
        let (store, cache) = setup(vec![]);

        let err = Bootstrapper::new(&cache)
            .run(vec![
                DeclaredRecord::new(1).with("name", "red"),
                DeclaredRecord::new(1).with("name", "blue"),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));

        let err = Bootstrapper::new(&cache)
            .run(vec![
                DeclaredRecord::new(1).with("name", "red"),
                DeclaredRecord::new(2).with("name", "red"),
            ])
            .unwrap_err();
        assert_eq!(err.invalid_record().map(|r| r.id), Some(2));

        let err = Bootstrapper::new(&cache)
            .run(vec![DeclaredRecord::new(1)])
            .unwrap_err();
        assert!(err.to_string().contains("name can't be blank"));

        assert!(store.list("colors").unwrap().is_empty());
    }

    #[test]
    fn unique_secondary_collision_fails_before_any_write() {
        let seeded = vec![
            Record::new(1).with("name", "red").with("html", "#f00"),
            Record::new(2).with("name", "blue").with("html", "#00f"),
        ];
        let store = Arc::new(InMemoryStore::with_records("colors", seeded.clone()));
        let kind = EnumerationType::new("Color").index(AttributeSpec::new("html").unique());
        let cache = EnumerationCache::new(kind, store.clone(), Config::default()).unwrap();

        let err = Bootstrapper::new(&cache)
            .run(vec![
                DeclaredRecord::new(1).with("name", "red").with("html", "#f00"),
                DeclaredRecord::new(2).with("name", "blue").with("html", "#f00"),
            ])
            .unwrap_err();

        assert!(matches!(err, CoreError::RecordInvalid { .. }));
        assert_eq!(err.invalid_record().map(|r| r.id), Some(2));
        assert!(err.to_string().contains("html has already been taken"));
        assert_eq!(store.list("colors").unwrap(), seeded);
        assert_eq!(cache.resolver().resolve(2).unwrap().unwrap().value_of("html"), Value::from("#00f"));
    }

    #[test]
    fn alias_collision_fails_before_any_write() {
        let (store, _) = setup(vec![Record::new(1).with("name", "Hot Red")]);
        let kind = EnumerationType::new("Color").safe_aliases(true);
        let cache = EnumerationCache::new(kind, store.clone(), Config::default()).unwrap();

        let err = Bootstrapper::new(&cache)
            .run(vec![
                DeclaredRecord::new(1).with("name", "Hot Red"),
                DeclaredRecord::new(2).with("name", "hot-red"),
            ])
            .unwrap_err();

        assert!(matches!(err, CoreError::RecordInvalid { .. }));
        assert_eq!(err.invalid_record().map(|r| r.id), Some(2));
        assert_eq!(store.list("colors").unwrap(), vec![Record::new(1).with("name", "Hot Red")]);
        assert_eq!(cache.resolver().resolve(1).unwrap().unwrap().id, 1);
        assert_eq!(cache.resolver().resolve("hot_red").unwrap().unwrap().id, 1);
    }

    #[test]
    fn store_rejection_halts_remaining_writes() {
        let (store, cache) = setup(vec![]);
        store.set_validator(Box::new(|_, record| {
            (record.id == 2).then(|| "rejected".to_string())
        }));

        let err = Bootstrapper::new(&cache)
            .run(vec![
                DeclaredRecord::new(1).with("name", "red"),
                DeclaredRecord::new(2).with("name", "blue"),
                DeclaredRecord::new(3).with("name", "green"),
            ])
            .unwrap_err();

        assert_eq!(err.invalid_record().map(|r| r.id), Some(2));
        let ids: Vec<_> = store.list("colors").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
        assert!(!cache.is_loaded());
    }

    #[test]
    fn declarations_from_json() {
        let declared: Vec<DeclaredRecord> = serde_json::from_str(
            r##"[{"id": 1, "name": "red", "defaults": {"html": "#f00"}}, {"name": "blue"}]"##,
        )
        .unwrap();

        assert_eq!(declared[0], DeclaredRecord::new(1).with("name", "red").with_default("html", "#f00"));
        assert_eq!(declared[1].id, None);
    }
}

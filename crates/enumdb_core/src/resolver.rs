//! Key-based lookups with miss policies.

use crate::cache::EnumerationCache;
use crate::error::{CoreError, CoreResult};
use crate::normalize::{IntoKey, Key, KeyNormalizer, KeyTypeError, Lookup};
use crate::types::MissPolicy;
use enumdb_store::{Record, Value};
use std::sync::Arc;

/// The `[]`-style entry point of one enumeration.
///
/// Accepts ids, strings, symbols, nil, and tuples for multi-attribute
/// enumerations, normalizes them and applies the miss policy:
///
/// | Policy | nil | unmatched id/name |
/// |--------|-----|-------------------|
/// | `Raise` | `RecordNotFound` | `RecordNotFound` |
/// | `RaiseOnlyForTypedKeys` | `None` | `RecordNotFound` |
/// | `Silent` | `None` | `None` |
///
/// A key of an unsupported type is always `InvalidKeyType`.
#[derive(Debug, Clone, Copy)]
pub struct LookupResolver<'a> {
    cache: &'a EnumerationCache,
    normalizer: KeyNormalizer,
    policy: MissPolicy,
}

impl<'a> LookupResolver<'a> {
    pub(crate) fn new(cache: &'a EnumerationCache) -> Self {
        let kind = cache.enumeration();
        Self {
            cache,
            normalizer: KeyNormalizer::new(kind.arity()),
            policy: kind.effective_miss_policy(cache.config()),
        }
    }

    /// Overrides the miss policy for this resolver.
    #[must_use]
    pub fn with_policy(mut self, policy: MissPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active miss policy.
    pub fn policy(&self) -> MissPolicy {
        self.policy
    }

    /// Resolves a key to a record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyType` for unsupported keys and `RecordNotFound`
    /// on a miss when the policy raises for that key.
    pub fn resolve(&self, key: impl IntoKey) -> CoreResult<Option<Arc<Record>>> {
        let (key, lookup) = self.normalize(key)?;
        let found = self.cache.lookup(&lookup)?;
        if found.is_none() && self.raises_for(&key) {
            return Err(self.not_found(&key));
        }
        Ok(found)
    }

    /// Resolves every key, failing if any of them misses.
    ///
    /// Ignores the miss policy.
    ///
    /// # Errors
    ///
    /// Returns one `RecordNotFound` naming every missing key.
    pub fn resolve_all<I, K>(&self, keys: I) -> CoreResult<Vec<Arc<Record>>>
    where
        I: IntoIterator<Item = K>,
        K: IntoKey,
    {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for key in keys {
            let (key, lookup) = self.normalize(key)?;
            match self.cache.lookup(&lookup)? {
                Some(record) => found.push(record),
                None => missing.push(key.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            Err(CoreError::record_not_found(
                self.cache.enumeration().name(),
                missing.join(", "),
            ))
        }
    }

    /// Resolves every key, skipping the ones that miss.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyType` for unsupported keys.
    pub fn find_all_by_enumerator<I, K>(&self, keys: I) -> CoreResult<Vec<Arc<Record>>>
    where
        I: IntoIterator<Item = K>,
        K: IntoKey,
    {
        let mut found = Vec::new();
        for key in keys {
            let (_, lookup) = self.normalize(key)?;
            found.extend(self.cache.lookup(&lookup)?);
        }
        Ok(found)
    }

    /// Resolves a key without ever raising on a miss.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyType` for unsupported keys.
    pub fn find_by_enumerator(&self, key: impl IntoKey) -> CoreResult<Option<Arc<Record>>> {
        let (_, lookup) = self.normalize(key)?;
        self.cache.lookup(&lookup)
    }

    /// Whether a record matches the key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyType` for unsupported keys.
    pub fn includes(&self, key: impl IntoKey) -> CoreResult<bool> {
        Ok(self.find_by_enumerator(key)?.is_some())
    }

    /// Whether `record` is the record identified by `key`.
    ///
    /// Replaces per-value predicates like `red?`; a key that matches no
    /// record is simply `false`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyType` for unsupported keys.
    pub fn matches(&self, record: &Record, key: impl IntoKey) -> CoreResult<bool> {
        Ok(self
            .find_by_enumerator(key)?
            .is_some_and(|found| found.id == record.id))
    }

    /// Whether `record` matches any of the keys.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyType` for unsupported keys.
    pub fn in_any<I, K>(&self, record: &Record, keys: I) -> CoreResult<bool>
    where
        I: IntoIterator<Item = K>,
        K: IntoKey,
    {
        for key in keys {
            if self.matches(record, key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The enumerator value of a record, its display form.
    ///
    /// A list for multi-attribute enumerations.
    pub fn enumerator(&self, record: &Record) -> Value {
        let mut values = self.cache.enumeration().enumerator_values(record);
        if values.len() == 1 {
            values.remove(0)
        } else {
            Value::List(values)
        }
    }

    fn normalize(&self, key: impl IntoKey) -> CoreResult<(Key, Lookup)> {
        let key = key.into_key().map_err(|e| self.type_error(e))?;
        let lookup = self.normalizer.normalize(&key).map_err(|e| self.type_error(e))?;
        Ok((key, lookup))
    }

    fn raises_for(&self, key: &Key) -> bool {
        match self.policy {
            MissPolicy::Raise => true,
            MissPolicy::RaiseOnlyForTypedKeys => !key.is_nil(),
            MissPolicy::Silent => false,
        }
    }

    fn type_error(&self, err: KeyTypeError) -> CoreError {
        CoreError::invalid_key_type(self.cache.enumeration().name(), err.type_name)
    }

    fn not_found(&self, key: &Key) -> CoreError {
        CoreError::record_not_found(self.cache.enumeration().name(), key.to_string())
    }
}

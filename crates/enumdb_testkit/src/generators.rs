//! Property-based test generators using proptest.
//!
//! Provides strategies for generating enumeration data that maintains
//! the invariants the cache relies on (unique ids, unique enumerators).

use enumdb_core::{DeclaredRecord, Key, Record, Value};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy for enumerator values: short, non-blank, mixed case and
/// punctuation so safe aliases get exercised.
pub fn enumerator_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 _!-]{0,11}").expect("Invalid regex")
}

/// Strategy for a set of distinct enumerator values.
///
/// Values are distinct after safe-aliasing too, so the set is valid for
/// enumerations with aliases enabled.
pub fn enumerator_set_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(enumerator_value_strategy(), 0..=max).prop_map(|values| {
        let mut seen = HashSet::new();
        values
            .into_iter()
            .filter(|value| {
                let alias = enumdb_core::safe_alias(value);
                !alias.is_empty() && seen.insert(alias)
            })
            .collect()
    })
}

/// Strategy for auxiliary attribute values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-z#0-9]{0,8}".prop_map(Value::Text),
    ]
}

/// Strategy for records of a `name`-enumerated type, with ids `1..=n`.
pub fn records_strategy(max: usize) -> impl Strategy<Value = Vec<Record>> {
    enumerator_set_strategy(max).prop_flat_map(|names| {
        let len = names.len();
        prop::collection::vec(value_strategy(), len).prop_map(move |extras| {
            names
                .iter()
                .zip(extras)
                .enumerate()
                .map(|(i, (name, extra))| {
                    Record::new(i as i64 + 1)
                        .with("name", name.as_str())
                        .with("extra", extra)
                })
                .collect()
        })
    })
}

/// Strategy for declarations of a `name`-enumerated type with defaults.
pub fn declarations_strategy(max: usize) -> impl Strategy<Value = Vec<DeclaredRecord>> {
    records_strategy(max).prop_map(|records| {
        records
            .into_iter()
            .map(|record| {
                DeclaredRecord::new(record.id)
                    .with("name", record.value_of("name"))
                    .with_default("extra", record.value_of("extra"))
            })
            .collect()
    })
}

/// Strategy for lookup keys of every supported shape.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    let leaf = prop_oneof![
        Just(Key::Nil),
        (-5i64..20).prop_map(Key::Id),
        enumerator_value_strategy().prop_map(Key::Text),
        enumerator_value_strategy().prop_map(|name| Key::symbol(name)),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Key::Tuple)
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

//! Fixture enumerations and registry helpers.
//!
//! Provides the enumerations used throughout the test suites, their
//! declared records, and registries pre-seeded with them.

use enumdb_core::{AttributeSpec, DeclaredRecord, EnumerationRegistry, EnumerationType, MissPolicy, Value};
use enumdb_store::{InMemoryStore, JsonFileStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// `Color`: enumerated by `name`, with a unique `html` code.
pub fn color_type() -> EnumerationType {
    EnumerationType::new("Color").index(AttributeSpec::new("html").unique())
}

/// Declared colors. `html` is a default, so stored edits survive.
pub fn color_declarations() -> Vec<DeclaredRecord> {
    vec![
        DeclaredRecord::new(1).with("name", "red").with_default("html", "#ff0000"),
        DeclaredRecord::new(2).with("name", "blue").with_default("html", "#0000ff"),
        DeclaredRecord::new(3).with("name", "green").with_default("html", "#00ff00"),
    ]
}

/// `AccessPath`: enumerated by `(controller, action)`.
pub fn access_path_type() -> EnumerationType {
    EnumerationType::new("AccessPath").enumerate_by(["controller", "action"])
}

/// Declared access paths, `users/index` before `users/new`.
pub fn access_path_declarations() -> Vec<DeclaredRecord> {
    vec![
        DeclaredRecord::new(1).with("controller", "users").with("action", "index"),
        DeclaredRecord::new(2).with("controller", "users").with("action", "new"),
        DeclaredRecord::new(3).with("controller", "posts").with("action", "index"),
    ]
}

/// `Book`: enumerated by `title`, ordered by `rank`, with safe aliases and
/// a non-unique `author` index.
pub fn book_type() -> EnumerationType {
    EnumerationType::new("Book")
        .enumerate_by(["title"])
        .order_by("rank")
        .safe_aliases(true)
        .index(AttributeSpec::new("author"))
        .miss_policy(MissPolicy::RaiseOnlyForTypedKeys)
}

/// Declared books, out of rank order.
pub fn book_declarations() -> Vec<DeclaredRecord> {
    vec![
        DeclaredRecord::new(1)
            .with("title", "The Pragmatic Programmer")
            .with("author", "Hunt")
            .with("rank", 2),
        DeclaredRecord::new(2)
            .with("title", "Hot-Red!")
            .with("author", "Anon")
            .with("rank", 3),
        DeclaredRecord::new(3)
            .with("title", "Programming Pearls")
            .with("author", "Bentley")
            .with("rank", 1),
        DeclaredRecord::new(4)
            .with("title", "More Programming Pearls")
            .with("author", "Bentley")
            .with("rank", 4),
    ]
}

/// `Country`: enumerated by `code`, silent on misses, with a computed
/// lowercase-name index.
pub fn country_type() -> EnumerationType {
    EnumerationType::new("Country")
        .collection("countries")
        .enumerate_by(["code"])
        .miss_policy(MissPolicy::Silent)
        .index(AttributeSpec::computed("slug", |record| {
            record
                .value_of("name")
                .as_text()
                .map_or(Value::Null, |name| Value::from(enumdb_core::safe_alias(name)))
        }))
}

/// Declared countries.
pub fn country_declarations() -> Vec<DeclaredRecord> {
    vec![
        DeclaredRecord::new(1).with("code", "NZ").with("name", "New Zealand"),
        DeclaredRecord::new(2).with("code", "US").with("name", "United States"),
        DeclaredRecord::new(3).with("code", "GB").with("name", "United Kingdom"),
    ]
}

/// Every fixture type with its declarations.
pub fn all_fixtures() -> Vec<(EnumerationType, Vec<DeclaredRecord>)> {
    vec![
        (color_type(), color_declarations()),
        (access_path_type(), access_path_declarations()),
        (book_type(), book_declarations()),
        (country_type(), country_declarations()),
    ]
}

/// A registry over an in-memory store, with access to the store.
pub struct TestRegistry {
    /// The registry.
    pub registry: EnumerationRegistry,
    /// The store behind it, for out-of-band edits and call counting.
    pub store: Arc<InMemoryStore>,
}

impl TestRegistry {
    /// An empty registry with nothing registered.
    pub fn empty() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            registry: EnumerationRegistry::new(store.clone()),
            store,
        }
    }

    /// A registry with every fixture registered and bootstrapped.
    pub fn seeded() -> Self {
        let test = Self::empty();
        for (kind, declared) in all_fixtures() {
            let name = kind.name().to_string();
            test.registry.register(kind).expect("Failed to register fixture");
            test.registry
                .bootstrap(&name, declared)
                .expect("Failed to bootstrap fixture");
        }
        test
    }
}

impl std::ops::Deref for TestRegistry {
    type Target = EnumerationRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

/// Runs a test against a registry seeded with only `Color`.
///
/// # Example
///
/// ```rust
/// use enumdb_testkit::with_color_registry;
///
/// with_color_registry(|registry| {
///     assert_eq!(registry.all("Color").unwrap().len(), 3);
/// });
/// ```
pub fn with_color_registry<F, R>(f: F) -> R
where
    F: FnOnce(&EnumerationRegistry) -> R,
{
    let test = TestRegistry::empty();
    test.registry
        .register(color_type())
        .expect("Failed to register Color");
    test.registry
        .bootstrap("Color", color_declarations())
        .expect("Failed to bootstrap Color");
    f(&test.registry)
}

/// Runs a test against a registry backed by a JSON file in a temp dir.
///
/// The closure also receives the file path so it can reopen the store.
pub fn with_file_registry<F, R>(f: F) -> R
where
    F: FnOnce(&EnumerationRegistry, &Path) -> R,
{
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("enumerations.json");
    let store = JsonFileStore::open(&path).expect("Failed to open JSON store");
    let registry = EnumerationRegistry::new(Arc::new(store));
    f(&registry, &path)
}

/// Parses declarations from a JSON seed document.
///
/// # Panics
///
/// Panics if the document is not a JSON array of declarations.
pub fn declarations_from_json(json: &str) -> Vec<DeclaredRecord> {
    serde_json::from_str(json).expect("Invalid declaration JSON")
}

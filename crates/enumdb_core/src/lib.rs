//! # enumdb Core
//!
//! Cached, multi-key indexed lookups over small reference-data
//! collections ("enumerations" such as colors, countries or status codes).
//!
//! This crate provides:
//! - Key normalization for ids, strings, symbols, safe aliases and tuples
//! - Index building over a full snapshot in one pass
//! - A concurrency-safe per-type cache with lazy, single-flight loading
//! - Bootstrap reconciliation of declared records against the store
//! - A resolver front-end with configurable miss policies
//! - A registry that owns one cache per enumeration type
//!
//! ## Example
//!
//! ```rust
//! use enumdb_core::{EnumerationRegistry, EnumerationType, DeclaredRecord};
//! use enumdb_store::InMemoryStore;
//! use std::sync::Arc;
//!
//! let registry = EnumerationRegistry::new(Arc::new(InMemoryStore::new()));
//! registry.register(EnumerationType::new("Color")).unwrap();
//! registry
//!     .bootstrap(
//!         "Color",
//!         vec![
//!             DeclaredRecord::new(1).with("name", "red"),
//!             DeclaredRecord::new(2).with("name", "blue"),
//!         ],
//!     )
//!     .unwrap();
//!
//! let red = registry.resolve("Color", "red").unwrap().unwrap();
//! assert_eq!(red.id, 1);
//! assert!(registry.resolve("Color", 3).is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bootstrap;
mod cache;
mod config;
mod error;
mod index;
mod normalize;
mod registry;
mod resolver;
mod schema;
mod stats;
mod types;

pub use bootstrap::{Bootstrapper, DeclaredRecord};
pub use cache::{CacheBypass, EnumerationCache, Snapshot, UpdatePermit};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use index::{AttributeIndex, HashIndex, IndexBuilder, IndexCollision, Indexes, PrefixIndex};
pub use normalize::{safe_alias, Atom, IntoKey, Key, KeyNormalizer, KeyTypeError, Lookup, Symbol};
pub use registry::EnumerationRegistry;
pub use resolver::LookupResolver;
pub use schema::{AttributeSpec, EnumerationType, Extractor};
pub use stats::{CacheStats, StatsSnapshot};
pub use types::{CacheOp, Generation, MissPolicy};

pub use enumdb_store::{Attributes, Record, RecordId, RecordStore, Value};

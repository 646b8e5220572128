//! # enumdb Store
//!
//! Backing-store interface and reference implementations for enumdb.
//!
//! This crate is the lowest layer of enumdb. A store is the authoritative
//! home of enumeration records; the cache in `enumdb_core` only ever holds a
//! snapshot of what the store returned.
//!
//! ## Design Principles
//!
//! - Stores know nothing about enumerators, indexes or miss policies
//! - Full scans (`list`) are the only read path the cache needs
//! - Writes happen inside an exclusive [`WriteSession`]
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral reference data
//! - [`JsonFileStore`] - Persists every collection in one JSON document
//!
//! ## Example
//!
//! ```rust
//! use enumdb_store::{InMemoryStore, Record, RecordStore};
//!
//! let store = InMemoryStore::new();
//! store.create("colors", Record::new(1).with("name", "red")).unwrap();
//! let records = store.list("colors").unwrap();
//! assert_eq!(records[0].get("name").and_then(|v| v.as_text()), Some("red"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod record;
mod value;

pub use backend::{RecordStore, WriteSession};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::InMemoryStore;
pub use record::{Attributes, Record, RecordId};
pub use value::Value;

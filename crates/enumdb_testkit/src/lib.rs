//! # enumdb Testkit
//!
//! Test utilities for enumdb.
//!
//! This crate provides:
//! - Fixture enumerations (Color, AccessPath, Book, Country) and registry helpers
//! - Property-based test generators using proptest
//! - Concurrent stress helpers for the cache
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use enumdb_testkit::prelude::*;
//!
//! with_color_registry(|registry| {
//!     let red = registry.resolve("Color", "red").unwrap().unwrap();
//!     assert_eq!(red.id, 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use stress::*;

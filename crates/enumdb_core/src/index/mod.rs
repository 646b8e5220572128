//! In-memory indexes over an enumeration snapshot.
//!
//! Indexes are access paths, rebuilt wholesale on every load:
//! - The id index is always present and unique
//! - Single-attribute enumerators get a unique attribute index, optionally
//!   with safe alias entries
//! - Multi-attribute enumerators get a prefix index instead
//! - Secondary attributes get unique or non-unique hash indexes
//!
//! # Index Types
//!
//! - [`HashIndex`]: O(1) equality lookup
//! - [`PrefixIndex`]: O(1) lookup by any leading part of a tuple

mod builder;
mod hash;
mod prefix;

pub use builder::{AttributeIndex, IndexBuilder, Indexes};
pub use hash::{HashIndex, IndexCollision};
pub use prefix::PrefixIndex;

//! Record type shared by stores and the cache.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric record identifier, unique within one collection.
pub type RecordId = i64;

/// Named attribute values of a record (excluding the id).
pub type Attributes = BTreeMap<String, Value>;

/// A single enumeration record.
///
/// Records are plain data: an id plus named attributes. Once the cache
/// publishes a record it is shared behind an `Arc` and never mutated again;
/// changes go through the store and become visible after a reload or an
/// incremental cache update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record id.
    pub id: RecordId,
    /// Attribute values.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Record {
    /// Creates a record with the given id and no attributes.
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            attributes: Attributes::new(),
        }
    }

    /// Creates a record from an id and an attribute map.
    #[must_use]
    pub fn with_attributes(id: RecordId, attributes: Attributes) -> Self {
        Self { id, attributes }
    }

    /// Sets an attribute, returning the record.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns the record id.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns a stored attribute value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns an attribute value by name, treating `id` as an attribute.
    ///
    /// Missing attributes read as [`Value::Null`].
    pub fn value_of(&self, name: &str) -> Value {
        if name == "id" {
            return Value::Integer(self.id);
        }
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Sets an attribute in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Returns all attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

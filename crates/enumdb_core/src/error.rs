//! Error types for enumdb core.

use enumdb_store::{Record, RecordId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in enumdb core operations.
///
/// None of these are retried internally. Store failures pass through
/// unchanged as [`CoreError::Store`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] enumdb_store::StoreError),

    /// A lookup key of an unsupported type was supplied.
    #[error("{enumeration}: key should be an id, string, symbol or tuple but got a {type_name}")]
    InvalidKeyType {
        /// Enumeration being queried.
        enumeration: String,
        /// Description of the offending type.
        type_name: String,
    },

    /// No record matched the key.
    #[error("couldn't find {enumeration} identified by {key}")]
    RecordNotFound {
        /// Enumeration being queried.
        enumeration: String,
        /// The requested key, rendered for display.
        key: String,
    },

    /// Enumeration data was modified outside the permitted path.
    #[error("{enumeration}: changes to enumeration records are not permitted ({operation})")]
    ModificationNotPermitted {
        /// Enumeration whose records were targeted.
        enumeration: String,
        /// The rejected operation.
        operation: String,
    },

    /// A record failed validation while being saved.
    #[error("{enumeration}: record {} is invalid: {message}", record.id)]
    RecordInvalid {
        /// Enumeration being written.
        enumeration: String,
        /// The offending record.
        record: Box<Record>,
        /// Validation message.
        message: String,
    },

    /// Two records collide on a unique key, or a key cannot be indexed.
    #[error("{enumeration}: index integrity violation on {attribute}: {reason}")]
    IndexIntegrityViolation {
        /// Enumeration being indexed.
        enumeration: String,
        /// Attribute (or attribute tuple) being indexed.
        attribute: String,
        /// What went wrong.
        reason: String,
    },

    /// The enumeration type is not registered.
    #[error("unknown enumeration: {name}")]
    UnknownEnumeration {
        /// Requested type name.
        name: String,
    },

    /// The attribute has no index.
    #[error("{enumeration}: attribute {attribute} is not indexed")]
    UnknownAttribute {
        /// Enumeration being queried.
        enumeration: String,
        /// Requested attribute.
        attribute: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid key type error.
    pub fn invalid_key_type(enumeration: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::InvalidKeyType {
            enumeration: enumeration.into(),
            type_name: type_name.into(),
        }
    }

    /// Creates a record not found error.
    pub fn record_not_found(enumeration: impl Into<String>, key: impl Into<String>) -> Self {
        Self::RecordNotFound {
            enumeration: enumeration.into(),
            key: key.into(),
        }
    }

    /// Creates a modification not permitted error.
    pub fn modification_not_permitted(
        enumeration: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::ModificationNotPermitted {
            enumeration: enumeration.into(),
            operation: operation.into(),
        }
    }

    /// Creates a record invalid error.
    pub fn record_invalid(
        enumeration: impl Into<String>,
        record: Record,
        message: impl Into<String>,
    ) -> Self {
        Self::RecordInvalid {
            enumeration: enumeration.into(),
            record: Box::new(record),
            message: message.into(),
        }
    }

    /// Creates an index integrity violation error.
    pub fn integrity_violation(
        enumeration: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IndexIntegrityViolation {
            enumeration: enumeration.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown enumeration error.
    pub fn unknown_enumeration(name: impl Into<String>) -> Self {
        Self::UnknownEnumeration { name: name.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the offending record of a `RecordInvalid` error.
    pub fn invalid_record(&self) -> Option<&Record> {
        match self {
            Self::RecordInvalid { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Whether this error reports a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

/// Id of a record as shown in messages.
pub(crate) fn describe_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

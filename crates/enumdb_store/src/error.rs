//! Error types for store operations.

use crate::record::RecordId;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No record with the given id exists in the collection.
    #[error("record {id} not found in collection {collection}")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Missing record id.
        id: RecordId,
    },

    /// A record with the given id already exists in the collection.
    #[error("record {id} already exists in collection {collection}")]
    AlreadyExists {
        /// Collection written to.
        collection: String,
        /// Conflicting record id.
        id: RecordId,
    },

    /// The store rejected the record's contents.
    #[error("record {id} rejected: {message}")]
    Validation {
        /// Rejected record id.
        id: RecordId,
        /// Why the store rejected it.
        message: String,
    },

    /// The store is closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(collection: impl Into<String>, id: RecordId) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id,
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(collection: impl Into<String>, id: RecordId) -> Self {
        Self::AlreadyExists {
            collection: collection.into(),
            id,
        }
    }

    /// Creates a validation error.
    pub fn validation(id: RecordId, message: impl Into<String>) -> Self {
        Self::Validation {
            id,
            message: message.into(),
        }
    }
}

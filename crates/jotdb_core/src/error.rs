//! Error types for the jotdb engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] jotdb_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A JSON document string could not be decoded.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record body could not be encoded to MessagePack.
    #[error("record encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// A record body could not be decoded from MessagePack.
    #[error("record decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A record stream ended mid-record.
    #[error("corrupt record stream: {message}")]
    Corruption {
        /// Description of the damage.
        message: String,
    },

    /// The input was not a usable document.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the shape problem.
        message: String,
    },

    /// The configured primary-key field is absent from the document.
    #[error("primary key '{field}' not found in document")]
    MissingPrimaryKey {
        /// The configured primary-key field name.
        field: String,
    },

    /// A document with this id already exists.
    #[error("document with id '{id}' already exists")]
    DuplicateId {
        /// The conflicting id.
        id: String,
    },

    /// No document with this id exists.
    #[error("document with id '{id}' not found")]
    NotFound {
        /// The missing id.
        id: String,
    },

    /// A fuzzy pattern could not be compiled for the scan path.
    #[error("invalid fuzzy pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What the matcher complained about.
        message: String,
    },

    /// Another process holds the database directory lock.
    #[error("database locked: another process has exclusive access")]
    Locked,

    /// The database has been closed.
    #[error("database is closed")]
    Closed,
}

impl Error {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid-document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}

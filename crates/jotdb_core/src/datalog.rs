//! Append-only data file records and manager.
//!
//! The data file is the authoritative durable snapshot. It only ever
//! grows: inserts and updates append the full document, deletes append a
//! tombstone (a record with no body). At load time the records are
//! applied in file order, so the last record per id wins and a tombstone
//! leaves the id absent.

use crate::error::Result;
use crate::frame::{encode, FrameReader};
use crate::value::Fields;
use jotdb_storage::StorageBackend;
use serde::{Deserialize, Serialize};

/// One data-file record: a document snapshot or a tombstone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    /// The document id.
    #[serde(rename = "ID")]
    pub id: String,
    /// The document body; `None` marks a tombstone.
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Fields>,
}

impl DataRecord {
    /// Builds a document snapshot record.
    #[must_use]
    pub fn put(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data: Some(data),
        }
    }

    /// Builds a tombstone record.
    #[must_use]
    pub fn tombstone(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: None,
        }
    }
}

/// Manager for the append-only data file.
pub struct DataLog {
    backend: Box<dyn StorageBackend>,
}

impl DataLog {
    /// Creates a manager over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Appends one record as a single frame.
    pub fn append(&self, record: &DataRecord) -> Result<u64> {
        let body = rmp_serde::to_vec_named(record)?;
        Ok(self.backend.append(&encode(&body)?)?)
    }

    /// Reads every record in file order.
    pub fn records(&self) -> Result<Vec<DataRecord>> {
        FrameReader::new(self.backend.as_ref())?
            .map(|body| Ok(rmp_serde::from_slice(&body?)?))
            .collect()
    }

    /// Current file size in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.backend.len()?)
    }

    /// Forces appended records to durable storage.
    pub fn sync(&self) -> Result<()> {
        self.backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for DataLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLog").finish_non_exhaustive()
    }
}

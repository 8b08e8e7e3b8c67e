//! Write-ahead log records and manager.
//!
//! Every mutation appends one framed record here before it touches the
//! in-memory store; the append is the linearization point of the
//! mutation. At open the surviving records are replayed against the
//! loaded data file and the log is then truncated to empty.

use crate::error::Result;
use crate::frame::{encode, FrameReader};
use crate::value::Fields;
use jotdb_storage::StorageBackend;
use serde::{Deserialize, Serialize};

/// Kind of mutation a WAL record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalOp {
    /// A new document was inserted.
    #[serde(rename = "INSERT")]
    Insert,
    /// An existing document was replaced.
    #[serde(rename = "UPDATE")]
    Update,
    /// A document was removed.
    #[serde(rename = "DELETE")]
    Delete,
}

/// One logged mutation.
///
/// `doc` carries the full post-mutation document body for inserts and
/// updates and is absent for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// The operation kind.
    #[serde(rename = "Operation")]
    pub op: WalOp,
    /// The document id.
    #[serde(rename = "ID")]
    pub id: String,
    /// The document body, absent on delete.
    #[serde(rename = "Document", default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Fields>,
}

impl WalRecord {
    /// Builds an insert record.
    #[must_use]
    pub fn insert(id: impl Into<String>, doc: Fields) -> Self {
        Self {
            op: WalOp::Insert,
            id: id.into(),
            doc: Some(doc),
        }
    }

    /// Builds an update record carrying the merged document.
    #[must_use]
    pub fn update(id: impl Into<String>, doc: Fields) -> Self {
        Self {
            op: WalOp::Update,
            id: id.into(),
            doc: Some(doc),
        }
    }

    /// Builds a delete record.
    #[must_use]
    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            op: WalOp::Delete,
            id: id.into(),
            doc: None,
        }
    }
}

/// Append-only manager for the WAL file.
pub struct WalLog {
    backend: Box<dyn StorageBackend>,
    sync_on_write: bool,
}

impl WalLog {
    /// Creates a manager over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend,
            sync_on_write,
        }
    }

    /// Appends one record as a single frame.
    ///
    /// Returns the offset the frame was written at. The frame is built in
    /// full before it reaches the backend, so concurrent appenders never
    /// interleave within a record.
    pub fn append(&self, record: &WalRecord) -> Result<u64> {
        let body = rmp_serde::to_vec_named(record)?;
        let offset = self.backend.append(&encode(&body)?)?;
        if self.sync_on_write {
            self.backend.sync()?;
        }
        Ok(offset)
    }

    /// Reads every surviving record in append order.
    pub fn records(&self) -> Result<Vec<WalRecord>> {
        FrameReader::new(self.backend.as_ref())?
            .map(|body| Ok(rmp_serde::from_slice(&body?)?))
            .collect()
    }

    /// Discards all records.
    pub fn clear(&self) -> Result<()> {
        self.backend.truncate(0)?;
        Ok(())
    }

    /// Current log size in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.backend.len()?)
    }

    /// Forces appended records to durable storage.
    pub fn sync(&self) -> Result<()> {
        self.backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for WalLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalLog")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use jotdb_storage::InMemoryBackend;

    fn wal() -> WalLog {
        WalLog::new(Box::new(InMemoryBackend::new()), false)
    }

    fn sample_doc() -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), Value::from("1"));
        fields.insert("name".to_string(), Value::from("Alice"));
        fields
    }

    #[test]
    fn append_and_read_back() {
        let wal = wal();
        let record = WalRecord::insert("1", sample_doc());
        wal.append(&record).unwrap();

        let records = wal.records().unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn records_preserve_append_order() {
        let wal = wal();
        let r1 = WalRecord::insert("1", sample_doc());
        let r2 = WalRecord::update("1", sample_doc());
        let r3 = WalRecord::delete("1");

        wal.append(&r1).unwrap();
        wal.append(&r2).unwrap();
        wal.append(&r3).unwrap();

        assert_eq!(wal.records().unwrap(), vec![r1, r2, r3]);
    }

    #[test]
    fn delete_record_has_no_document() {
        let wal = wal();
        wal.append(&WalRecord::delete("gone")).unwrap();

        let records = wal.records().unwrap();
        assert_eq!(records[0].op, WalOp::Delete);
        assert!(records[0].doc.is_none());
    }

    #[test]
    fn clear_empties_the_log() {
        let wal = wal();
        wal.append(&WalRecord::insert("1", sample_doc())).unwrap();
        assert!(wal.size().unwrap() > 0);

        wal.clear().unwrap();
        assert_eq!(wal.size().unwrap(), 0);
        assert!(wal.records().unwrap().is_empty());
    }

    #[test]
    fn empty_log_reads_empty() {
        assert!(wal().records().unwrap().is_empty());
    }
}

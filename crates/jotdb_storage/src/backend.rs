//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level, append-oriented byte store.
///
/// jotdb keeps two record streams per database (the WAL and the data
/// file); each stream sits on top of one backend. Backends take `&self`
/// and lock internally, so a single `append` call is atomic with respect
/// to every other operation on the same backend — the log managers rely
/// on this to make one framed record one indivisible write.
///
/// # Invariants
///
/// - `append` returns the offset the data was written at
/// - `read_at` returns exactly the bytes previously written there, and
///   fails rather than short-reads
/// - `len` is the offset the next `append` will write at
/// - `sync` makes all previously appended data durable
pub trait StorageBackend: Send + Sync {
    /// Returns the current size of the storage in bytes.
    fn len(&self) -> StorageResult<u64>;

    /// Returns true if the storage holds no bytes.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`](crate::StorageError::ReadPastEnd)
    /// if the requested range extends beyond the current size, or an I/O
    /// error from the underlying medium.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` atomically and returns the offset it was written at.
    fn append(&self, data: &[u8]) -> StorageResult<u64>;

    /// Truncates the storage to `new_len` bytes.
    ///
    /// # Errors
    ///
    /// Fails if `new_len` exceeds the current size; truncation never grows
    /// the storage.
    fn truncate(&self, new_len: u64) -> StorageResult<()>;

    /// Forces all appended data down to the durable medium.
    fn sync(&self) -> StorageResult<()>;
}

//! In-memory storage backend for tests.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An ephemeral backend that keeps all bytes in a `Vec`.
///
/// Used by the log-layer unit tests; nothing written here survives the
/// process.
///
/// # Example
///
/// ```rust
/// use jotdb_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.append(b"test data").unwrap();
/// assert_eq!(backend.len().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend seeded with `data`, for recovery-style tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of everything written so far.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn len(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let end = offset.saturating_add(len as u64);
        if end > data.len() as u64 {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: data.len() as u64,
            });
        }
        let start = offset as usize;
        Ok(data[start..start + len].to_vec())
    }

    fn append(&self, bytes: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn truncate(&self, new_len: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        if new_len > data.len() as u64 {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_len,
                size: data.len() as u64,
            });
        }
        data.truncate(new_len as usize);
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read() {
        let backend = InMemoryBackend::new();
        let offset = backend.append(b"abc").unwrap();
        assert_eq!(offset, 0);
        assert_eq!(backend.read_at(0, 3).unwrap(), b"abc");
    }

    #[test]
    fn seeded_data_is_readable() {
        let backend = InMemoryBackend::with_data(vec![1, 2, 3, 4]);
        assert_eq!(backend.len().unwrap(), 4);
        assert_eq!(backend.read_at(1, 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn read_past_end_fails() {
        let backend = InMemoryBackend::new();
        backend.append(b"ab").unwrap();
        assert!(matches!(
            backend.read_at(0, 3),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn truncate_to_zero_clears() {
        let backend = InMemoryBackend::new();
        backend.append(b"abcdef").unwrap();
        backend.truncate(0).unwrap();
        assert!(backend.is_empty().unwrap());
    }
}

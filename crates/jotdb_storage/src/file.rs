//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Persistent storage on top of a single OS file.
///
/// The file is opened read-write without truncation, so existing contents
/// survive reopening. One mutex guards the file handle and its cached
/// length; every trait operation seeks explicitly, which keeps appends
/// and positional reads from interleaving.
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<FileInner>,
}

struct FileInner {
    file: File,
    len: u64,
}

impl FileBackend {
    /// Opens or creates the file at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileInner { file, len }),
        })
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn len(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().len)
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let end = offset.saturating_add(len as u64);
        if end > inner.len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: inner.len,
            });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        inner.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        inner.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&self, data: &[u8]) -> StorageResult<u64> {
        let mut inner = self.inner.lock();
        let offset = inner.len;
        inner.file.seek(SeekFrom::End(0))?;
        inner.file.write_all(data)?;
        inner.len += data.len() as u64;
        Ok(offset)
    }

    fn truncate(&self, new_len: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if new_len > inner.len {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_len,
                size: inner.len,
            });
        }
        inner.file.set_len(new_len)?;
        inner.file.sync_all()?;
        inner.len = new_len;
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.bin");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.len().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn append_returns_offsets() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("log.bin")).unwrap();

        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.len().unwrap(), 11);
        assert_eq!(backend.read_at(0, 11).unwrap(), b"hello world");
    }

    #[test]
    fn read_past_end_is_an_error() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("log.bin")).unwrap();
        backend.append(b"hello").unwrap();

        let result = backend.read_at(3, 10);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn contents_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.bin");

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.append(b"durable").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.len().unwrap(), 7);
        assert_eq!(backend.read_at(0, 7).unwrap(), b"durable");
    }

    #[test]
    fn truncate_discards_tail() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("log.bin")).unwrap();
        backend.append(b"keep-drop").unwrap();

        backend.truncate(4).unwrap();
        assert_eq!(backend.len().unwrap(), 4);
        assert_eq!(backend.read_at(0, 4).unwrap(), b"keep");
    }

    #[test]
    fn truncate_cannot_grow() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("log.bin")).unwrap();
        backend.append(b"abc").unwrap();

        let result = backend.truncate(100);
        assert!(matches!(result, Err(StorageError::TruncateBeyondEnd { .. })));
    }
}

//! Database directory layout and locking.
//!
//! ```text
//! <db_path>/
//! ├─ LOCK       # advisory lock, one process at a time
//! ├─ data.db    # append-only document snapshots + tombstones
//! └─ wal.log    # write-ahead log, truncated after replay at open
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const DATA_FILE: &str = "data.db";
const WAL_FILE: &str = "wal.log";
const LOCK_FILE: &str = "LOCK";

/// Owns the database directory and its advisory lock.
///
/// The lock is held for the lifetime of the value and released when it
/// is dropped; a second opener fails with [`Error::Locked`] instead of
/// silently sharing files it cannot safely share.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Creates the directory if needed and acquires the exclusive lock.
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(Error::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// The database directory itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the append-only data file.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.path.join(DATA_FILE)
    }

    /// Path of the write-ahead log.
    #[must_use]
    pub fn wal_path(&self) -> PathBuf {
        self.path.join(WAL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("fresh");
        assert!(!db_path.exists());

        let dir = DatabaseDir::open(&db_path).unwrap();
        assert!(db_path.is_dir());
        assert_eq!(dir.data_path(), db_path.join("data.db"));
        assert_eq!(dir.wal_path(), db_path.join("wal.log"));
    }

    #[test]
    fn second_open_is_locked_out() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("locked");

        let _dir = DatabaseDir::open(&db_path).unwrap();
        assert!(matches!(DatabaseDir::open(&db_path), Err(Error::Locked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("reopen");

        {
            let _dir = DatabaseDir::open(&db_path).unwrap();
        }
        let _dir = DatabaseDir::open(&db_path).unwrap();
    }
}

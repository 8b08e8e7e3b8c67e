//! Database facade: lifecycle and the mutation protocol.

use crate::config::Config;
use crate::datalog::{DataLog, DataRecord};
use crate::dir::DatabaseDir;
use crate::error::{Error, Result};
use crate::index::IndexRegistry;
use crate::logging::{self, LogLevel};
use crate::store::{Document, DocumentStore};
use crate::value::{Fields, Value};
use crate::wal::{WalLog, WalOp, WalRecord};
use crate::writer::{BackgroundWriter, WriteJob};
use dashmap::mapref::entry::Entry;
use jotdb_storage::FileBackend;
use parking_lot::{Mutex, RwLock};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An embeddable document database.
///
/// Every mutation follows the same protocol: append to the WAL while the
/// document's map entry is exclusively held, apply the in-memory change,
/// bring the secondary indexes up to date, then queue an append to the
/// data file on the background writer pool. The WAL append is the
/// linearization point; a failure before it leaves the store untouched.
///
/// All methods take `&self`; the handle is meant to be shared across
/// threads behind an `Arc`.
pub struct Database {
    pub(crate) config: Config,
    dir: DatabaseDir,
    pub(crate) store: DocumentStore,
    pub(crate) registry: IndexRegistry,
    wal: WalLog,
    data: Arc<DataLog>,
    writer: Mutex<BackgroundWriter>,
    /// Index installation takes this exclusively; mutations take it
    /// shared. Reads ignore it entirely.
    maintenance: RwLock<()>,
    open: AtomicBool,
}

impl Database {
    /// Opens (or creates) the database in `path`.
    ///
    /// `primary_key` names the field of every inserted document that is
    /// treated as its id; `workers` sizes the background writer pool.
    pub fn open(primary_key: &str, path: &Path, workers: usize) -> Result<Self> {
        Self::open_with_config(path, Config::new(primary_key).workers(workers))
    }

    /// Opens (or creates) the database in `path` with full configuration.
    ///
    /// The open pipeline: lock the directory, load the data file into
    /// memory (tombstones drop their ids), replay whatever the WAL still
    /// holds - re-appending each replayed record to the data file so the
    /// recovered state is durable - then truncate the WAL and start the
    /// writer pool.
    pub fn open_with_config(path: &Path, config: Config) -> Result<Self> {
        logging::init();
        info!(
            path = %path.display(),
            primary_key = %config.primary_key,
            workers = config.workers,
            "opening database"
        );

        let dir = DatabaseDir::open(path)?;
        let data = Arc::new(DataLog::new(Box::new(FileBackend::open(&dir.data_path())?)));
        let wal = WalLog::new(
            Box::new(FileBackend::open(&dir.wal_path())?),
            config.sync_on_write,
        );

        let store = DocumentStore::new();
        let loaded = Self::load_data(&store, &data)?;
        let replayed = Self::replay_wal(&store, &wal, &data)?;
        wal.clear()?;
        store.reset_count();

        let writer = BackgroundWriter::spawn(Arc::clone(&data), config.workers)?;

        info!(documents = store.count(), loaded, replayed, "database opened");
        Ok(Self {
            config,
            dir,
            store,
            registry: IndexRegistry::new(),
            wal,
            data,
            writer: Mutex::new(writer),
            maintenance: RwLock::new(()),
            open: AtomicBool::new(true),
        })
    }

    /// Applies every data-file record in file order: the last record per
    /// id wins, and a tombstone leaves the id absent.
    fn load_data(store: &DocumentStore, data: &DataLog) -> Result<usize> {
        let mut applied = 0usize;
        for record in data.records()? {
            match record.data {
                Some(fields) => {
                    store.docs.insert(record.id, Arc::new(fields));
                }
                None => {
                    store.docs.remove(&record.id);
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Replays WAL records that never reached the data file before the
    /// last shutdown. Each one is re-appended to the data file so that
    /// truncating the WAL afterwards loses nothing.
    fn replay_wal(store: &DocumentStore, wal: &WalLog, data: &DataLog) -> Result<usize> {
        let mut applied = 0usize;
        for record in wal.records()? {
            match record.op {
                WalOp::Insert | WalOp::Update => {
                    let fields = record.doc.ok_or_else(|| {
                        Error::corruption(format!(
                            "WAL {:?} record for '{}' has no document body",
                            record.op, record.id
                        ))
                    })?;
                    data.append(&DataRecord::put(record.id.as_str(), fields.clone()))?;
                    store.docs.insert(record.id, Arc::new(fields));
                }
                WalOp::Delete => {
                    data.append(&DataRecord::tombstone(record.id.as_str()))?;
                    store.docs.remove(&record.id);
                }
            }
            applied += 1;
        }
        if applied > 0 {
            info!(operations = applied, "recovered operations from WAL");
        }
        Ok(applied)
    }

    /// The directory this database lives in.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    /// Inserts a new document.
    ///
    /// The configured primary-key field must be present; its canonical
    /// text form becomes the document id, which must be unused.
    pub fn insert(&self, doc: Fields) -> Result<()> {
        self.ensure_open()?;

        let id = doc
            .get(&self.config.primary_key)
            .map(ToString::to_string)
            .ok_or_else(|| Error::MissingPrimaryKey {
                field: self.config.primary_key.clone(),
            })?;
        debug!(%id, "inserting document");

        let _guard = self.maintenance.read();
        let snapshot: Document = match self.store.docs.entry(id.clone()) {
            Entry::Occupied(_) => {
                warn!(%id, "document already exists");
                return Err(Error::DuplicateId { id });
            }
            Entry::Vacant(slot) => {
                let snapshot = Arc::new(doc);
                self.wal
                    .append(&WalRecord::insert(id.as_str(), (*snapshot).clone()))?;
                slot.insert(Arc::clone(&snapshot));
                snapshot
            }
        };

        self.registry.index_document(&id, &snapshot);
        self.store.increment();
        self.writer.lock().submit(WriteJob::Put {
            id: id.clone(),
            doc: snapshot,
        });

        info!(%id, "document inserted");
        Ok(())
    }

    /// Inserts a new document given as a JSON object string.
    pub fn insert_json(&self, json: &str) -> Result<()> {
        let decoded: serde_json::Value = serde_json::from_str(json)?;
        match Value::from_json(decoded) {
            Value::Map(fields) => self.insert(fields),
            _ => Err(Error::invalid_document(
                "expected a top-level JSON object",
            )),
        }
    }

    /// Overlays `patch` onto the document with `id`.
    ///
    /// The patch is shallow: a patched field replaces the old value
    /// wholesale, nested maps included. The replacement document is
    /// swapped in atomically; readers holding the old snapshot keep it.
    pub fn update(&self, id: &str, patch: Fields) -> Result<()> {
        self.ensure_open()?;
        debug!(id, "updating document");

        let _guard = self.maintenance.read();
        let (old, new) = {
            let Some(mut entry) = self.store.docs.get_mut(id) else {
                warn!(id, "document not found for update");
                return Err(Error::NotFound { id: id.to_string() });
            };

            let old = Arc::clone(entry.value());
            let mut merged = (*old).clone();
            for (field, value) in patch {
                merged.insert(field, value);
            }
            let new: Document = Arc::new(merged);

            self.wal.append(&WalRecord::update(id, (*new).clone()))?;
            *entry.value_mut() = Arc::clone(&new);
            (old, new)
        };

        self.registry.update_document(id, &old, &new);
        self.writer.lock().submit(WriteJob::Put {
            id: id.to_string(),
            doc: new,
        });

        info!(id, "document updated");
        Ok(())
    }

    /// Deletes the document with `id`.
    ///
    /// Deleting an unknown id is a warning, not an error.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.ensure_open()?;
        debug!(id, "deleting document");

        let _guard = self.maintenance.read();
        let removed: Option<Document> = match self.store.docs.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                self.wal.append(&WalRecord::delete(id))?;
                Some(entry.remove())
            }
            Entry::Vacant(_) => None,
        };

        let Some(doc) = removed else {
            warn!(id, "document not found for deletion");
            return Ok(());
        };

        self.registry.remove_document(id, &doc);
        self.store.decrement();
        self.writer.lock().submit(WriteJob::Tombstone {
            id: id.to_string(),
        });

        info!(id, "document deleted");
        Ok(())
    }

    /// Returns the document with `id`, if present.
    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        self.ensure_open()?;
        Ok(self.store.get(id))
    }

    /// Returns a snapshot of every document, in no particular order.
    pub fn get_all(&self) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let docs = self.store.get_all();
        debug!(count = docs.len(), "snapshotted all documents");
        Ok(docs)
    }

    /// The current document count.
    pub fn count(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.store.count())
    }

    /// Creates a single-field index on `field` and back-fills it from
    /// every stored document.
    ///
    /// Creating an index that already exists is a warning, not an error.
    /// Installation excludes mutations but runs concurrently with reads.
    pub fn create_index(&self, field: &str) -> Result<()> {
        self.ensure_open()?;
        info!(field, "creating index");

        let _guard = self.maintenance.write();
        let Some(index) = self.registry.register_single(field) else {
            warn!(field, "index already exists");
            return Ok(());
        };

        let mut indexed = 0usize;
        for entry in self.store.docs.iter() {
            index.index_document(entry.key(), entry.value());
            indexed += 1;
        }
        info!(field, indexed, "index created");
        Ok(())
    }

    /// Creates a composite index over `fields` (registry key
    /// `fields.join("-")`) and back-fills it.
    ///
    /// Creating an index that already exists is a warning, not an error.
    pub fn create_composite_index(&self, fields: &[&str]) -> Result<()> {
        self.ensure_open()?;
        info!(?fields, "creating composite index");

        let owned: Vec<String> = fields.iter().map(ToString::to_string).collect();
        let _guard = self.maintenance.write();
        let Some(index) = self.registry.register_composite(owned) else {
            warn!(?fields, "composite index already exists");
            return Ok(());
        };

        let mut indexed = 0usize;
        for entry in self.store.docs.iter() {
            index.index_document(entry.key(), entry.value());
            indexed += 1;
        }
        info!(?fields, indexed, "composite index created");
        Ok(())
    }

    /// Sets the verbosity of the default log output.
    pub fn set_log_level(&self, level: LogLevel) {
        logging::set_level(level);
    }

    /// Redirects the default log output to an arbitrary byte sink.
    pub fn set_log_output(&self, sink: Box<dyn Write + Send>) {
        logging::set_output(sink);
    }

    /// Closes the database: waits for every queued data-file write, then
    /// syncs both files. Further operations fail with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Err(Error::Closed);
        }
        info!("closing database");
        self.writer.lock().shutdown();
        self.data.sync()?;
        self.wal.sync()?;
        info!("database closed");
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.open.load(Ordering::Acquire) {
            if let Err(error) = self.close() {
                warn!(%error, "failed to close database on drop");
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.dir.path())
            .field("primary_key", &self.config.primary_key)
            .field("documents", &self.store.count())
            .finish_non_exhaustive()
    }
}

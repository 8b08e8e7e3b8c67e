//! Bounded background pool for data-file appends.
//!
//! Mutations are acknowledged as soon as the WAL and the in-memory state
//! are updated; mirroring the document into the data file happens here,
//! on a fixed pool of worker threads fed through a channel. The pool
//! size bounds how many data-file writes are in flight, and joining the
//! workers on shutdown drains every queued write.

use crate::datalog::{DataLog, DataRecord};
use crate::store::Document;
use crossbeam_channel::{unbounded, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, warn};

/// One queued data-file write.
pub(crate) enum WriteJob {
    /// Append the document's current snapshot.
    Put {
        /// Document id.
        id: String,
        /// Snapshot to persist.
        doc: Document,
    },
    /// Append a tombstone for a deleted id.
    Tombstone {
        /// Document id.
        id: String,
    },
}

/// The worker pool. Dropping the sender side ends the workers once the
/// queue is drained; `shutdown` does that and joins them.
pub(crate) struct BackgroundWriter {
    tx: Option<Sender<WriteJob>>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundWriter {
    /// Spawns `workers` threads writing to `data`.
    pub(crate) fn spawn(data: Arc<DataLog>, workers: usize) -> io::Result<Self> {
        let (tx, rx) = unbounded::<WriteJob>();
        let mut handles = Vec::with_capacity(workers.max(1));

        for n in 0..workers.max(1) {
            let rx = rx.clone();
            let data = Arc::clone(&data);
            let handle = thread::Builder::new()
                .name(format!("jotdb-data-writer-{n}"))
                .spawn(move || {
                    for job in rx.iter() {
                        let record = match job {
                            WriteJob::Put { id, doc } => DataRecord::put(id, (*doc).clone()),
                            WriteJob::Tombstone { id } => DataRecord::tombstone(id),
                        };
                        // The mutation is already acknowledged; a failed
                        // mirror write is logged, not surfaced.
                        if let Err(error) = data.append(&record) {
                            error!(id = %record.id, %error, "data file write failed");
                        }
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            tx: Some(tx),
            handles,
        })
    }

    /// Queues one write.
    pub(crate) fn submit(&self, job: WriteJob) {
        match &self.tx {
            Some(tx) => {
                if tx.send(job).is_err() {
                    warn!("data writer queue is closed; dropping write");
                }
            }
            None => warn!("data writer already shut down; dropping write"),
        }
    }

    /// Closes the queue and waits for every queued write to finish.
    pub(crate) fn shutdown(&mut self) {
        self.tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Fields, Value};
    use jotdb_storage::InMemoryBackend;

    fn doc(name: &str) -> Document {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(name));
        Arc::new(fields)
    }

    #[test]
    fn shutdown_drains_the_queue() {
        let data = Arc::new(DataLog::new(Box::new(InMemoryBackend::new())));
        let mut writer = BackgroundWriter::spawn(Arc::clone(&data), 4).unwrap();

        for i in 0..100 {
            writer.submit(WriteJob::Put {
                id: i.to_string(),
                doc: doc("x"),
            });
        }
        writer.submit(WriteJob::Tombstone {
            id: "0".to_string(),
        });
        writer.shutdown();

        assert_eq!(data.records().unwrap().len(), 101);
    }

    #[test]
    fn submit_after_shutdown_is_dropped() {
        let data = Arc::new(DataLog::new(Box::new(InMemoryBackend::new())));
        let mut writer = BackgroundWriter::spawn(Arc::clone(&data), 1).unwrap();
        writer.shutdown();

        writer.submit(WriteJob::Tombstone {
            id: "late".to_string(),
        });
        assert!(data.records().unwrap().is_empty());
    }
}

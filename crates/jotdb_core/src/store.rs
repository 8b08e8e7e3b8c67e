//! The concurrent in-memory document store.

use crate::value::Fields;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A stored document: an immutable, reference-counted snapshot of its
/// field map.
///
/// Updates never mutate a document in place; they swap a freshly built
/// snapshot into the store, so any reader holding one of these keeps a
/// consistent view for as long as it likes and can never observe a
/// partially applied patch.
pub type Document = Arc<Fields>;

/// Primary-key to document map with an atomic document count.
///
/// The map's per-entry locking is the per-id linearization point for
/// mutations; the database layer holds an entry while it writes the WAL
/// and swaps the snapshot. Entry locks are leaves: nothing else is
/// acquired while one is held except the WAL append itself.
#[derive(Debug, Default)]
pub struct DocumentStore {
    pub(crate) docs: DashMap<String, Document>,
    count: AtomicU64,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the document stored under `id`.
    ///
    /// The returned snapshot is shared, not copied; it stays valid even
    /// if the document is concurrently updated or deleted.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Document> {
        self.docs.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns a snapshot of every document, in no particular order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Document> {
        self.docs
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// The current document count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn decrement(&self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }

    /// Resets the counter to the map's actual size. Used once at the end
    /// of the open pipeline, after load and replay have settled.
    pub(crate) fn reset_count(&self) {
        self.count.store(self.docs.len() as u64, Ordering::Release);
    }
}

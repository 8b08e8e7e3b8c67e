//! Secondary indexes: single-field, composite, and their registry.

mod composite;
mod single;

pub use composite::CompositeIndex;
pub use single::SingleIndex;

use crate::value::Fields;
use dashmap::DashMap;
use std::sync::Arc;

/// A registered index of either kind.
#[derive(Debug, Clone)]
pub enum IndexEntry {
    /// A single-field index with its trie.
    Single(Arc<SingleIndex>),
    /// A composite index over several fields.
    Composite(Arc<CompositeIndex>),
}

/// The process-wide registry of indexes for one database.
///
/// Keyed by field name for single-field indexes and by the `"-"`-joined
/// field list for composite indexes. Mutations walk every entry; each
/// entry serializes itself through its own lock, and no two index locks
/// are ever held at once.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    entries: DashMap<String, IndexEntry>,
}

impl IndexRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry key of a composite field list.
    #[must_use]
    pub fn composite_key(fields: &[String]) -> String {
        fields.join("-")
    }

    /// Registers a single-field index.
    ///
    /// Returns the new index, or `None` if the key was already taken.
    pub fn register_single(&self, field: &str) -> Option<Arc<SingleIndex>> {
        match self.entries.entry(field.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let index = Arc::new(SingleIndex::new(field));
                slot.insert(IndexEntry::Single(Arc::clone(&index)));
                Some(index)
            }
        }
    }

    /// Registers a composite index over `fields`.
    ///
    /// Returns the new index, or `None` if the key was already taken.
    pub fn register_composite(&self, fields: Vec<String>) -> Option<Arc<CompositeIndex>> {
        match self.entries.entry(Self::composite_key(&fields)) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let index = Arc::new(CompositeIndex::new(fields));
                slot.insert(IndexEntry::Composite(Arc::clone(&index)));
                Some(index)
            }
        }
    }

    /// Looks up the entry registered under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<IndexEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Incorporates a freshly stored document into every index.
    pub fn index_document(&self, id: &str, doc: &Fields) {
        for entry in self.entries.iter() {
            match entry.value() {
                IndexEntry::Single(index) => index.index_document(id, doc),
                IndexEntry::Composite(index) => index.index_document(id, doc),
            }
        }
    }

    /// Propagates a document replacement through every index.
    pub fn update_document(&self, id: &str, old: &Fields, new: &Fields) {
        for entry in self.entries.iter() {
            match entry.value() {
                IndexEntry::Single(index) => index.update_document(id, old, new),
                IndexEntry::Composite(index) => index.update_document(id, old, new),
            }
        }
    }

    /// Removes a deleted document from every index.
    pub fn remove_document(&self, id: &str, doc: &Fields) {
        for entry in self.entries.iter() {
            match entry.value() {
                IndexEntry::Single(index) => index.remove_document(id, doc),
                IndexEntry::Composite(index) => index.remove_document(id, doc),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn doc(name: &str, age: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("age".to_string(), Value::from(age));
        fields
    }

    #[test]
    fn register_single_once() {
        let registry = IndexRegistry::new();
        assert!(registry.register_single("age").is_some());
        assert!(registry.register_single("age").is_none());
        assert!(matches!(registry.get("age"), Some(IndexEntry::Single(_))));
    }

    #[test]
    fn register_composite_under_joined_key() {
        let registry = IndexRegistry::new();
        let fields = vec!["name".to_string(), "age".to_string()];
        assert!(registry.register_composite(fields.clone()).is_some());
        assert!(registry.register_composite(fields).is_none());
        assert!(matches!(
            registry.get("name-age"),
            Some(IndexEntry::Composite(_))
        ));
    }

    #[test]
    fn mutations_walk_every_entry() {
        let registry = IndexRegistry::new();
        let single = registry.register_single("age").unwrap();
        let composite = registry
            .register_composite(vec!["name".to_string(), "age".to_string()])
            .unwrap();

        let old = doc("Bob", 25);
        registry.index_document("1", &old);
        assert_eq!(single.lookup_eq(&Value::from(25)), vec!["1"]);
        assert_eq!(composite.lookup("Bob-25"), vec!["1"]);

        let new = doc("Bob", 26);
        registry.update_document("1", &old, &new);
        assert_eq!(single.lookup_eq(&Value::from(26)), vec!["1"]);
        assert_eq!(composite.lookup("Bob-26"), vec!["1"]);

        registry.remove_document("1", &new);
        assert!(single.lookup_eq(&Value::from(26)).is_empty());
        assert!(composite.lookup("Bob-26").is_empty());
    }
}

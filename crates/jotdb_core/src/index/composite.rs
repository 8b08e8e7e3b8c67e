//! Composite index over an ordered list of fields.

use crate::value::Fields;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// An index over several fields at once.
///
/// The bucket key is the `"-"`-joined canonical text of each field's
/// value, in declaration order; a missing field contributes the empty
/// string. One lookup therefore answers an equality query over all the
/// fields together.
pub struct CompositeIndex {
    fields: Vec<String>,
    buckets: RwLock<HashMap<String, HashSet<String>>>,
}

impl CompositeIndex {
    /// Creates an empty index over `fields`.
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// The indexed fields, in key order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Computes the composite key of a document body.
    #[must_use]
    pub fn key_of(&self, doc: &Fields) -> String {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| doc.get(field).map(ToString::to_string).unwrap_or_default())
            .collect();
        parts.join("-")
    }

    /// Indexes `id` under the document's composite key.
    pub fn index_document(&self, id: &str, doc: &Fields) {
        let key = self.key_of(doc);
        self.buckets
            .write()
            .entry(key)
            .or_default()
            .insert(id.to_string());
    }

    /// Removes `id` from the document's composite key bucket.
    pub fn remove_document(&self, id: &str, doc: &Fields) {
        let key = self.key_of(doc);
        let mut buckets = self.buckets.write();
        if let Some(ids) = buckets.get_mut(&key) {
            ids.remove(id);
            if ids.is_empty() {
                buckets.remove(&key);
            }
        }
    }

    /// Moves `id` between buckets when the composite key changed between
    /// `old` and `new`.
    pub fn update_document(&self, id: &str, old: &Fields, new: &Fields) {
        let old_key = self.key_of(old);
        let new_key = self.key_of(new);
        if old_key == new_key {
            return;
        }

        let mut buckets = self.buckets.write();
        if let Some(ids) = buckets.get_mut(&old_key) {
            ids.remove(id);
            if ids.is_empty() {
                buckets.remove(&old_key);
            }
        }
        buckets.entry(new_key).or_default().insert(id.to_string());
    }

    /// Returns the ids stored under `key`.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Vec<String> {
        match self.buckets.read().get(key) {
            Some(ids) => ids.iter().cloned().collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for CompositeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeIndex")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn index() -> CompositeIndex {
        CompositeIndex::new(vec!["name".to_string(), "age".to_string()])
    }

    fn doc(name: &str, age: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("age".to_string(), Value::from(age));
        fields
    }

    #[test]
    fn key_joins_text_forms() {
        let index = index();
        assert_eq!(index.key_of(&doc("Bob", 25)), "Bob-25");
    }

    #[test]
    fn missing_field_contributes_empty_string() {
        let index = index();
        let mut partial = Fields::new();
        partial.insert("name".to_string(), Value::from("Bob"));
        assert_eq!(index.key_of(&partial), "Bob-");
    }

    #[test]
    fn index_and_lookup() {
        let index = index();
        index.index_document("1", &doc("Bob", 25));
        index.index_document("2", &doc("Bob", 30));

        assert_eq!(index.lookup("Bob-25"), vec!["1"]);
        assert_eq!(index.lookup("Bob-30"), vec!["2"]);
        assert!(index.lookup("Bob-99").is_empty());
    }

    #[test]
    fn update_moves_between_keys() {
        let index = index();
        let old = doc("Bob", 25);
        let new = doc("Bob", 26);
        index.index_document("1", &old);

        index.update_document("1", &old, &new);

        assert!(index.lookup("Bob-25").is_empty());
        assert_eq!(index.lookup("Bob-26"), vec!["1"]);
    }

    #[test]
    fn remove_drops_empty_bucket() {
        let index = index();
        let d = doc("Bob", 25);
        index.index_document("1", &d);
        index.remove_document("1", &d);
        assert!(index.lookup("Bob-25").is_empty());
        assert!(index.buckets.read().is_empty());
    }
}

//! Single-field index: value buckets plus a wildcard trie.

use crate::compare::Comparable;
use crate::trie::Trie;
use crate::value::{Fields, Value};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// An index over one document field.
///
/// Two structures live under one lock: the bucket map from coerced value
/// to the ids holding that value, and a trie over the lowercased text
/// form of each indexed value for fuzzy queries. Keeping them under the
/// same lock means a reader never sees one updated without the other.
pub struct SingleIndex {
    field: String,
    inner: RwLock<SingleInner>,
}

#[derive(Default)]
struct SingleInner {
    buckets: HashMap<Comparable, HashSet<String>>,
    trie: Trie,
}

impl SingleIndex {
    /// Creates an empty index on `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            inner: RwLock::new(SingleInner::default()),
        }
    }

    /// The indexed field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Indexes `id` under the document's current value of the field.
    ///
    /// A document without the field is skipped with a warning.
    pub fn index_document(&self, id: &str, doc: &Fields) {
        match doc.get(&self.field) {
            Some(value) => {
                let mut inner = self.inner.write();
                Self::add(&mut inner, id, value);
            }
            None => {
                warn!(id, field = %self.field, "document has no value for indexed field");
            }
        }
    }

    /// Removes `id` from the bucket and trie of the document's value.
    pub fn remove_document(&self, id: &str, doc: &Fields) {
        match doc.get(&self.field) {
            Some(value) => {
                let mut inner = self.inner.write();
                Self::drop_id(&mut inner, id, value);
            }
            None => {
                warn!(id, field = %self.field, "document has no value for indexed field");
            }
        }
    }

    /// Moves `id` between buckets when the field's value changed between
    /// `old` and `new`. Unchanged values are left alone.
    pub fn update_document(&self, id: &str, old: &Fields, new: &Fields) {
        let old_value = old.get(&self.field);
        let new_value = new.get(&self.field);

        let changed = match (old_value, new_value) {
            (None, None) => false,
            (Some(o), Some(n)) => Comparable::from(o) != Comparable::from(n),
            _ => true,
        };
        if !changed {
            return;
        }

        let mut inner = self.inner.write();
        if let Some(o) = old_value {
            Self::drop_id(&mut inner, id, o);
        }
        if let Some(n) = new_value {
            Self::add(&mut inner, id, n);
        }
    }

    fn add(inner: &mut SingleInner, id: &str, value: &Value) {
        let key = Comparable::from(value);
        let word = key.to_string();
        inner.buckets.entry(key).or_default().insert(id.to_string());
        inner.trie.insert(&word, id);
    }

    fn drop_id(inner: &mut SingleInner, id: &str, value: &Value) {
        let key = Comparable::from(value);
        if let Some(ids) = inner.buckets.get_mut(&key) {
            ids.remove(id);
            if ids.is_empty() {
                inner.buckets.remove(&key);
            }
        }
        inner.trie.remove(&key.to_string(), id);
    }

    /// Collects the ids of every bucket whose key equals `value` under
    /// the exact-query equality.
    #[must_use]
    pub fn lookup_eq(&self, value: &Value) -> Vec<String> {
        let probe = Comparable::from(value);
        let inner = self.inner.read();
        let mut ids = Vec::new();
        for (key, bucket) in &inner.buckets {
            if key.loose_eq(&probe) {
                ids.extend(bucket.iter().cloned());
            }
        }
        ids
    }

    /// Collects the ids of every bucket whose key falls in the closed
    /// interval `[min, max]` under the three-way compare.
    #[must_use]
    pub fn lookup_range(&self, min: &Comparable, max: &Comparable) -> Vec<String> {
        let inner = self.inner.read();
        let mut ids = Vec::new();
        for (key, bucket) in &inner.buckets {
            if key.compare(min).is_ge() && key.compare(max).is_le() {
                ids.extend(bucket.iter().cloned());
            }
        }
        ids
    }

    /// Runs a trie wildcard search over the indexed text forms.
    #[must_use]
    pub fn lookup_fuzzy(&self, pattern: &str) -> HashSet<String> {
        self.inner.read().trie.fuzzy_search(pattern)
    }
}

impl std::fmt::Debug for SingleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleIndex")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn index_and_lookup() {
        let index = SingleIndex::new("age");
        index.index_document("1", &doc(&[("age", Value::from(30))]));
        index.index_document("2", &doc(&[("age", Value::from(25))]));

        assert_eq!(index.lookup_eq(&Value::from(30)), vec!["1"]);
        assert!(index.lookup_eq(&Value::from(99)).is_empty());
    }

    #[test]
    fn int_and_float_buckets_match_loosely() {
        let index = SingleIndex::new("age");
        index.index_document("1", &doc(&[("age", Value::from(30))]));
        index.index_document("2", &doc(&[("age", Value::from(30.0))]));

        let mut ids = index.lookup_eq(&Value::from(30));
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn missing_field_is_skipped() {
        let index = SingleIndex::new("age");
        index.index_document("1", &doc(&[("name", Value::from("Bob"))]));
        assert!(index.lookup_eq(&Value::from("Bob")).is_empty());
    }

    #[test]
    fn update_moves_between_buckets() {
        let index = SingleIndex::new("age");
        let old = doc(&[("age", Value::from(30))]);
        let new = doc(&[("age", Value::from(31))]);
        index.index_document("1", &old);

        index.update_document("1", &old, &new);

        assert!(index.lookup_eq(&Value::from(30)).is_empty());
        assert_eq!(index.lookup_eq(&Value::from(31)), vec!["1"]);
    }

    #[test]
    fn update_with_unchanged_value_is_noop() {
        let index = SingleIndex::new("name");
        let old = doc(&[("name", Value::from("Ann")), ("age", Value::from(1))]);
        let new = doc(&[("name", Value::from("Ann")), ("age", Value::from(2))]);
        index.index_document("1", &old);

        index.update_document("1", &old, &new);
        assert_eq!(index.lookup_eq(&Value::from("Ann")), vec!["1"]);
    }

    #[test]
    fn update_can_drop_the_field() {
        let index = SingleIndex::new("age");
        let old = doc(&[("age", Value::from(30))]);
        let new = doc(&[("name", Value::from("Bob"))]);
        index.index_document("1", &old);

        index.update_document("1", &old, &new);
        assert!(index.lookup_eq(&Value::from(30)).is_empty());
    }

    #[test]
    fn remove_clears_bucket_and_trie() {
        let index = SingleIndex::new("name");
        let d = doc(&[("name", Value::from("Alice"))]);
        index.index_document("1", &d);

        index.remove_document("1", &d);

        assert!(index.lookup_eq(&Value::from("Alice")).is_empty());
        assert!(index.lookup_fuzzy("a*").is_empty());
    }

    #[test]
    fn range_over_buckets() {
        let index = SingleIndex::new("age");
        index.index_document("1", &doc(&[("age", Value::from(30))]));
        index.index_document("2", &doc(&[("age", Value::from(25))]));
        index.index_document("3", &doc(&[("age", Value::from(35))]));

        let min = Comparable::from(&Value::from(25));
        let max = Comparable::from(&Value::from(30));
        let mut ids = index.lookup_range(&min, &max);
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn fuzzy_uses_coerced_text() {
        let index = SingleIndex::new("age");
        index.index_document("1", &doc(&[("age", Value::from(30))]));
        assert_eq!(index.lookup_fuzzy("3*").len(), 1);
    }
}

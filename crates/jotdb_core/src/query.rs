//! Query surfaces: exact, composite, range, and fuzzy.
//!
//! Every surface prefers a registered index and falls back to a full
//! scan of the in-memory store. The two paths share their comparison
//! semantics (see [`crate::compare`]), so with the exception of result
//! order they return the same documents either way.

use crate::compare::Comparable;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::index::IndexEntry;
use crate::store::Document;
use crate::value::Value;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Database {
    /// Returns every document whose `field` equals `value`.
    ///
    /// Numbers compare as 64-bit floats (an integer field matches a
    /// float query of the same magnitude); strings compare as strings.
    pub fn query(&self, field: &str, value: impl Into<Value>) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let value = value.into();
        debug!(field, %value, "exact query");

        let results = match self.registry.get(field) {
            Some(IndexEntry::Single(index)) => {
                let docs = self.resolve_ids(index.lookup_eq(&value));
                info!(field, results = docs.len(), "query served from index");
                docs
            }
            // No index, or the registry key belongs to a composite
            // index: scan.
            _ => {
                let probe = Comparable::from(&value);
                let docs: Vec<Document> = self
                    .store
                    .docs
                    .iter()
                    .filter(|entry| {
                        entry
                            .value()
                            .get(field)
                            .is_some_and(|v| Comparable::from(v).loose_eq(&probe))
                    })
                    .map(|entry| Arc::clone(entry.value()))
                    .collect();
                info!(field, results = docs.len(), "query served by full scan");
                docs
            }
        };
        Ok(results)
    }

    /// Returns every document whose `fields` jointly equal `values`.
    ///
    /// Field order must match the order the composite index was created
    /// with. Without a matching index this degrades to a full scan over
    /// the joined composite key.
    pub fn query_composite(&self, fields: &[&str], values: &[Value]) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let lookup: String = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("-");
        debug!(?fields, key = %lookup, "composite query");

        let registry_key = fields.join("-");
        let results = match self.registry.get(&registry_key) {
            Some(IndexEntry::Composite(index)) => {
                let docs = self.resolve_ids(index.lookup(&lookup));
                info!(?fields, results = docs.len(), "composite query served from index");
                docs
            }
            _ => {
                warn!(?fields, "no composite index registered; falling back to full scan");
                let docs: Vec<Document> = self
                    .store
                    .docs
                    .iter()
                    .filter(|entry| {
                        let doc = entry.value();
                        let key: String = fields
                            .iter()
                            .map(|field| {
                                doc.get(*field).map(ToString::to_string).unwrap_or_default()
                            })
                            .collect::<Vec<_>>()
                            .join("-");
                        key == lookup
                    })
                    .map(|entry| Arc::clone(entry.value()))
                    .collect();
                info!(?fields, results = docs.len(), "composite query served by full scan");
                docs
            }
        };
        Ok(results)
    }

    /// Returns every document whose `field` lies in the closed interval
    /// `[min, max]` under the comparable coercion.
    ///
    /// An empty interval (`min > max`) yields no results.
    pub fn range_query(
        &self,
        field: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let min = Comparable::from(&min.into());
        let max = Comparable::from(&max.into());
        debug!(field, %min, %max, "range query");

        if min.compare(&max).is_gt() {
            return Ok(Vec::new());
        }

        let results = match self.registry.get(field) {
            Some(IndexEntry::Single(index)) => {
                let docs = self.resolve_ids(index.lookup_range(&min, &max));
                info!(field, results = docs.len(), "range query served from index");
                docs
            }
            _ => {
                let docs: Vec<Document> = self
                    .store
                    .docs
                    .iter()
                    .filter(|entry| {
                        entry.value().get(field).is_some_and(|v| {
                            let key = Comparable::from(v);
                            key.compare(&min).is_ge() && key.compare(&max).is_le()
                        })
                    })
                    .map(|entry| Arc::clone(entry.value()))
                    .collect();
                info!(field, results = docs.len(), "range query served by full scan");
                docs
            }
        };
        Ok(results)
    }

    /// Returns every document whose `field` matches `pattern`, where `*`
    /// matches any run of characters.
    ///
    /// The indexed path searches the trie with the lowercased pattern;
    /// the scan path matches the canonical text of the field value
    /// against the pattern compiled to an anchored matcher.
    pub fn fuzzy_query(&self, field: &str, pattern: &str) -> Result<Vec<Document>> {
        self.ensure_open()?;
        debug!(field, pattern, "fuzzy query");

        let results = match self.registry.get(field) {
            Some(IndexEntry::Single(index)) => {
                let docs = self.resolve_ids(index.lookup_fuzzy(pattern));
                info!(field, results = docs.len(), "fuzzy query served from index");
                docs
            }
            _ => {
                let matcher = wildcard_matcher(pattern)?;
                let docs: Vec<Document> = self
                    .store
                    .docs
                    .iter()
                    .filter(|entry| {
                        entry
                            .value()
                            .get(field)
                            .is_some_and(|v| matcher.is_match(&v.to_string()))
                    })
                    .map(|entry| Arc::clone(entry.value()))
                    .collect();
                info!(field, results = docs.len(), "fuzzy query served by full scan");
                docs
            }
        };
        Ok(results)
    }

    fn resolve_ids<I>(&self, ids: I) -> Vec<Document>
    where
        I: IntoIterator<Item = String>,
    {
        ids.into_iter()
            .filter_map(|id| self.store.get(&id))
            .collect()
    }
}

/// Compiles a `*`-wildcard pattern into an anchored regex: every
/// metacharacter is escaped, then `*` is re-enabled as `.*`.
fn wildcard_matcher(pattern: &str) -> Result<Regex> {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$")).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matcher_escapes_metacharacters() {
        let matcher = wildcard_matcher("a.c*").unwrap();
        assert!(matcher.is_match("a.cde"));
        assert!(!matcher.is_match("abcde"));
    }

    #[test]
    fn wildcard_matcher_is_anchored() {
        let matcher = wildcard_matcher("bob").unwrap();
        assert!(matcher.is_match("bob"));
        assert!(!matcher.is_match("bobby"));
        assert!(!matcher.is_match("a bob"));
    }

    #[test]
    fn lone_star_matches_anything() {
        let matcher = wildcard_matcher("*").unwrap();
        assert!(matcher.is_match(""));
        assert!(matcher.is_match("anything at all"));
    }
}

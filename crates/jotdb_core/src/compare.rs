//! Comparable coercion of heterogeneous field values.
//!
//! Range queries and index buckets need a single domain in which an
//! integer written by one caller and a float written by another can meet.
//! [`Comparable`] is that domain: every [`Value`] coerces into it, it can
//! serve as a hash-map key (floats by bit pattern), and it carries the
//! total ordering used by range queries plus the looser equality used by
//! exact queries.

use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A coerced, comparable form of a field value.
///
/// - every integer width and timestamps collapse to `Int` (timestamps as
///   Unix seconds)
/// - floats collapse to `Float`
/// - strings pass through as `Str`
/// - everything else is carried as its canonical text in `Text`
#[derive(Debug, Clone)]
pub enum Comparable {
    /// 64-bit signed integer form.
    Int(i64),
    /// 64-bit float form.
    Float(f64),
    /// String form.
    Str(String),
    /// Textual fallback for non-scalar values.
    Text(String),
}

impl From<&Value> for Comparable {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(i) => Comparable::Int(*i),
            Value::Float(x) => Comparable::Float(*x),
            Value::Time(t) => Comparable::Int(t.timestamp()),
            Value::Str(s) => Comparable::Str(s.clone()),
            other => Comparable::Text(other.to_string()),
        }
    }
}

impl Comparable {
    /// Three-way comparison.
    ///
    /// Integers compare numerically, floats via `total_cmp` (ordering
    /// against NaN is unspecified by contract, `total_cmp` keeps it
    /// deterministic), an integer meeting a float is promoted, strings
    /// compare in code-point order, and any other mixed pair falls back
    /// to comparing text forms.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Int(a), Comparable::Int(b)) => a.cmp(b),
            (Comparable::Float(a), Comparable::Float(b)) => a.total_cmp(b),
            (Comparable::Int(a), Comparable::Float(b)) => (*a as f64).total_cmp(b),
            (Comparable::Float(a), Comparable::Int(b)) => a.total_cmp(&(*b as f64)),
            (Comparable::Str(a), Comparable::Str(b)) => a.cmp(b),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }

    /// Equality as seen by exact queries.
    ///
    /// Numbers compare as 64-bit floats, so an integer field and a float
    /// field of the same magnitude match (a deliberate simplification
    /// shared by the indexed and the scan path). NaN never equals
    /// anything. Non-numbers match only within their own variant.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => match (self, other) {
                (Comparable::Str(a), Comparable::Str(b)) => a == b,
                (Comparable::Text(a), Comparable::Text(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Comparable::Int(i) => Some(*i as f64),
            Comparable::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl fmt::Display for Comparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparable::Int(i) => write!(f, "{i}"),
            Comparable::Float(x) => write!(f, "{x}"),
            Comparable::Str(s) | Comparable::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Bucket identity: exact variant and bit pattern. This is deliberately
/// stricter than [`Comparable::loose_eq`] - `Int(25)` and `Float(25.0)`
/// occupy distinct buckets, and the query layer bridges them.
impl PartialEq for Comparable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Float(a), Comparable::Float(b)) => a.to_bits() == b.to_bits(),
            (Comparable::Str(a), Comparable::Str(b)) => a == b,
            (Comparable::Text(a), Comparable::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Comparable {}

impl Hash for Comparable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Comparable::Int(i) => i.hash(state),
            Comparable::Float(x) => x.to_bits().hash(state),
            Comparable::Str(s) | Comparable::Text(s) => s.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cmp(a: &Value, b: &Value) -> Ordering {
        Comparable::from(a).compare(&Comparable::from(b))
    }

    #[test]
    fn integers_compare_numerically() {
        assert_eq!(cmp(&Value::from(2), &Value::from(10)), Ordering::Less);
        assert_eq!(cmp(&Value::from(10), &Value::from(10)), Ordering::Equal);
    }

    #[test]
    fn int_promotes_to_float() {
        assert_eq!(cmp(&Value::from(2), &Value::from(2.5)), Ordering::Less);
        assert_eq!(cmp(&Value::from(3.0), &Value::from(3)), Ordering::Equal);
    }

    #[test]
    fn strings_compare_by_code_point() {
        assert_eq!(cmp(&Value::from("abc"), &Value::from("abd")), Ordering::Less);
    }

    #[test]
    fn timestamps_coerce_to_unix_seconds() {
        let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(cmp(&Value::from(early), &Value::from(late)), Ordering::Less);
        assert_eq!(
            cmp(&Value::from(early), &Value::from(early.timestamp())),
            Ordering::Equal
        );
    }

    #[test]
    fn mixed_pair_falls_back_to_text() {
        // "30" vs 4: text compare, "30" < "4"
        assert_eq!(cmp(&Value::from("30"), &Value::from(4)), Ordering::Less);
    }

    #[test]
    fn loose_eq_bridges_int_and_float() {
        let a = Comparable::from(&Value::from(25));
        let b = Comparable::from(&Value::from(25.0));
        assert!(a.loose_eq(&b));
        assert_ne!(a, b); // distinct buckets
    }

    #[test]
    fn loose_eq_matches_strings() {
        let a = Comparable::from(&Value::from("Bob"));
        let b = Comparable::from(&Value::from("Bob"));
        assert!(a.loose_eq(&b));
        assert!(!a.loose_eq(&Comparable::from(&Value::from("bob"))));
    }

    #[test]
    fn loose_eq_never_matches_nan() {
        let nan = Comparable::from(&Value::from(f64::NAN));
        assert!(!nan.loose_eq(&nan));
    }

    #[test]
    fn loose_eq_rejects_cross_kind() {
        let s = Comparable::from(&Value::from("25"));
        let n = Comparable::from(&Value::from(25));
        assert!(!s.loose_eq(&n));
    }

    #[test]
    fn bucket_identity_is_bitwise() {
        use std::collections::HashMap;
        let mut buckets: HashMap<Comparable, u32> = HashMap::new();
        buckets.insert(Comparable::Float(f64::NAN), 1);
        // NaN equals itself as a bucket key even though loose_eq refuses it.
        assert!(buckets.contains_key(&Comparable::Float(f64::NAN)));
    }
}

//! # jotdb core
//!
//! An embeddable, in-process document store for schema-less records keyed
//! by a user-declared primary-key field.
//!
//! All documents stay resident in memory for querying. Every mutation is
//! appended to a write-ahead log before it becomes visible, then mirrored
//! to an append-only data file by a bounded pool of background writers,
//! so reopening a database restores exactly the state of the last
//! acknowledged mutation.
//!
//! Queries come in four shapes - single-field equality, composite-field
//! equality, numeric/time range, and `*`-wildcard fuzzy matching - and
//! each one runs against a secondary index when one is registered for the
//! field, falling back to a full scan otherwise.
//!
//! ```rust,no_run
//! use jotdb_core::{Database, Value};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> jotdb_core::Result<()> {
//! let db = Database::open("id", "my_database".as_ref(), 4)?;
//!
//! let mut doc = BTreeMap::new();
//! doc.insert("id".to_string(), Value::from("1"));
//! doc.insert("name".to_string(), Value::from("Alice"));
//! doc.insert("age".to_string(), Value::from(30));
//! db.insert(doc)?;
//!
//! db.create_index("age")?;
//! let adults = db.range_query("age", 18, 65)?;
//! assert_eq!(adults.len(), 1);
//! db.close()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod compare;
pub mod config;
pub mod database;
pub mod datalog;
pub mod dir;
pub mod error;
mod frame;
pub mod index;
pub mod logging;
pub mod store;
pub mod trie;
pub mod value;
pub mod wal;
mod writer;

mod query;

pub use config::Config;
pub use database::Database;
pub use error::{Error, Result};
pub use logging::LogLevel;
pub use store::Document;
pub use value::{Fields, Value};

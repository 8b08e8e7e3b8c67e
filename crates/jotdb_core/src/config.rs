//! Database configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// The field of every inserted document that is treated as its id.
    pub primary_key: String,

    /// Capacity of the background data-file writer pool.
    pub workers: usize,

    /// Whether to fsync the WAL after every append (safer but slower).
    ///
    /// Off by default: a mutation is acknowledged once the WAL write call
    /// returns, leaving the final flush to the OS.
    pub sync_on_write: bool,
}

impl Config {
    /// Creates a configuration with the given primary-key field and
    /// default settings.
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            workers: 4,
            sync_on_write: false,
        }
    }

    /// Sets the background writer pool capacity. Values below one are
    /// clamped to one.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets whether to fsync the WAL on every append.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}

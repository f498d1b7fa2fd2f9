//! # kvstore - Thread-Safe Ordered Key-Value Store
//!
//! A minimal key-value store built on the [`skipkv`] skip list.
//!
//! ## Features
//!
//! - **Ordered storage**: entries are kept sorted by key; a full scan
//!   yields them in ascending order.
//! - **Unique keys**: inserting a key that is already present is rejected.
//! - **Concurrent access**: readers share a lock, mutations are exclusive,
//!   so a reader never sees a half-linked entry.
//! - **Text snapshots**: the whole store can be dumped to and reloaded from
//!   a flat `key:value` file (see [`snapshot`]).
//!
//! ## Example
//!
//! ```rust
//! use kvstore::KvStore;
//!
//! let kv: KvStore<String, String> = KvStore::new();
//! assert!(kv.insert("user:1001".to_string(), "alice".to_string()));
//! assert!(!kv.insert("user:1001".to_string(), "bob".to_string()));
//!
//! assert_eq!(kv.get("user:1001"), Some("alice".to_string()));
//! assert_eq!(kv.remove("user:1001"), Some("alice".to_string()));
//! assert!(kv.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod snapshot;

pub use skipkv::{Iter, SkipList, MAX_LEVEL};
pub use snapshot::{SnapshotError, SnapshotFormat};

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info};

/// Configuration for the store.
#[derive(Debug, Clone)]
pub struct Config {
    /// File written by [`KvStore::dump`] and read by [`KvStore::load`].
    pub snapshot_path: PathBuf,
    /// Separator between key and value in snapshot lines.
    pub delimiter: char,
    /// Seed for tower heights; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/dump_file"),
            delimiter: snapshot::DEFAULT_DELIMITER,
            seed: None,
        }
    }
}

impl Config {
    /// Set the snapshot file path.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// Set the snapshot delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Use a fixed seed for tower heights.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Outcome of loading a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records added to the store.
    pub inserted: usize,
    /// Records whose key was already present (the stored value is kept).
    pub duplicates: usize,
    /// Lines skipped as malformed.
    pub malformed: usize,
}

/// A thread-safe ordered key-value store.
///
/// Lookups and scans share a read lock; inserts, removals and loads hold
/// the write lock for the whole traversal and relink. Lookups take the read
/// lock recursively, so they may run inside a [`KvStore::scan`] callback
/// even while a writer is queued.
pub struct KvStore<K, V> {
    inner: RwLock<SkipList<K, V>>,
    /// Number of entries, updated under the write lock
    len: AtomicUsize,
    format: SnapshotFormat,
    config: Config,
}

impl<K: Ord, V> KvStore<K, V> {
    /// Create a new empty store with default configuration.
    pub fn new() -> Self {
        Self::build(Config::default(), SnapshotFormat::default())
    }

    /// Create a new store with the given configuration.
    ///
    /// Fails if the configured delimiter is a line break.
    pub fn with_config(config: Config) -> snapshot::Result<Self> {
        let format = SnapshotFormat::new(config.delimiter)?;
        Ok(Self::build(config, format))
    }

    fn build(config: Config, format: SnapshotFormat) -> Self {
        let list = match config.seed {
            Some(seed) => SkipList::with_seed(seed),
            None => SkipList::new(),
        };
        Self {
            inner: RwLock::new(list),
            len: AtomicUsize::new(0),
            format,
            config,
        }
    }

    /// The store's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Insert a key-value pair.
    ///
    /// Returns `false` if the key already exists; the stored value is kept.
    pub fn insert(&self, key: K, value: V) -> bool {
        let mut inner = self.inner.write();
        let inserted = inner.insert(key, value);
        if inserted {
            self.len.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!("insert rejected: key already present");
        }
        inserted
    }

    /// Check if a key exists in the store.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.read_recursive().contains_key(key)
    }

    /// Get a copy of the value for a key.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        V: Clone,
    {
        self.inner.read_recursive().get(key).cloned()
    }

    /// Remove a key from the store.
    ///
    /// Returns the value if the key existed, `None` otherwise.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut inner = self.inner.write();
        let old = inner.remove(key);
        if old.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
            debug!(top_level = inner.top_level(), "removed key");
        } else {
            debug!("remove: key not found");
        }
        old
    }

    /// Copy out every entry in ascending key order.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let inner = self.inner.read_recursive();
        inner.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Run `f` over a lazy ordered scan while holding the read lock.
    ///
    /// Writers are blocked until `f` returns. `f` may call the read-only
    /// methods (`get`, `contains`, `entries`, `len`) but must not insert,
    /// remove or load, which would deadlock on the held lock.
    pub fn scan<R>(&self, f: impl FnOnce(Iter<'_, K, V>) -> R) -> R {
        let inner = self.inner.read_recursive();
        f(inner.iter())
    }

    /// Render every level of the underlying list, top level first.
    pub fn render_levels(&self) -> String
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        self.inner.read().levels().to_string()
    }

    /// Get the number of keys in the store.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write all entries to the configured snapshot path.
    pub fn dump(&self) -> snapshot::Result<usize>
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        self.dump_to(&self.config.snapshot_path)
    }

    /// Write all entries to `path`, replacing its contents.
    ///
    /// The read lock is held for the whole write, so the file is a
    /// point-in-time snapshot.
    pub fn dump_to(&self, path: impl AsRef<Path>) -> snapshot::Result<usize>
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        let path = path.as_ref();
        let written = {
            let inner = self.inner.read();
            self.format.dump_file(path, inner.iter())?
        };
        info!(path = %path.display(), records = written, "snapshot written");
        Ok(written)
    }

    /// Load entries from the configured snapshot path.
    pub fn load(&self) -> snapshot::Result<LoadReport>
    where
        K: FromStr,
        V: FromStr,
    {
        self.load_from(&self.config.snapshot_path)
    }

    /// Load entries from `path` into the store.
    ///
    /// The file is parsed before the write lock is taken; all records are
    /// then inserted under a single lock acquisition. Keys already present
    /// keep their current value.
    pub fn load_from(&self, path: impl AsRef<Path>) -> snapshot::Result<LoadReport>
    where
        K: FromStr,
        V: FromStr,
    {
        let path = path.as_ref();
        let records = self.format.load_file::<K, V>(path)?;

        let mut report = LoadReport {
            malformed: records.malformed,
            ..LoadReport::default()
        };
        {
            let mut inner = self.inner.write();
            for (key, value) in records.parsed {
                if inner.insert(key, value) {
                    report.inserted += 1;
                } else {
                    report.duplicates += 1;
                }
            }
            self.len.fetch_add(report.inserted, Ordering::Relaxed);
        }

        info!(
            path = %path.display(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            malformed = report.malformed,
            "snapshot loaded"
        );
        Ok(report)
    }
}

impl<K: Ord, V> Default for KvStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for KvStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner.read(), f)
    }
}

//! Storage backends
//!
//! Two abstractions sit underneath every index structure:
//! - [`KeyValueStore`]: a generic associative store
//! - [`TernaryStore`]: a store keyed by two ids mapping to a set of
//!   `(third id, provenance id)` pairs, the building block of the PSO and
//!   POS indexes
//!
//! Each comes with an in-memory implementation ([`MemoryStore`],
//! [`MemoryTernary`]) and a RocksDB-backed one ([`DiskStore`],
//! [`DiskTernary`]) implementing identical contracts.
//!
//! All stores share one lifecycle: mutations, any number of `compact`
//! calls, exactly one `finalize`, reads, then `close`. Mutating a
//! finalized store fails with [`StorageError::Finalized`].

pub mod codec;
pub mod disk;
pub mod memory;
pub mod parallel;

pub use codec::Codec;
pub use disk::{DiskStore, DiskTernary};
pub use memory::{MemoryStore, MemoryTernary};
pub use parallel::{fan_out, Task};

use crate::model::{Id, IdError, TripleDecodeError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Mutation of a finalized store
    #[error("storage is finalized")]
    Finalized,

    /// Use of a store that was never opened or has been closed
    #[error("storage is closed")]
    Closed,

    /// RocksDB error, with the store and operation that produced it
    #[error("{store}: {op} failed: {source}")]
    Backend {
        store: String,
        op: &'static str,
        #[source]
        source: rocksdb::Error,
    },

    /// Filesystem error while preparing a store directory
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Stored bytes could not be decoded
    #[error("Codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Triple(#[from] TripleDecodeError),

    /// A triple id taking part in conflict resolution has no stored record
    #[error("corrupted triple data: no record for {0}")]
    CorruptedReference(Id),

    /// Several independent stores failed
    #[error("{}", JoinedDisplay(.0))]
    Joined(Vec<StorageError>),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub(crate) fn backend(store: &str, op: &'static str, source: rocksdb::Error) -> Self {
        StorageError::Backend {
            store: store.to_string(),
            op,
            source,
        }
    }

    /// Turns the errors of a fan-out into a single result
    pub fn join(mut errors: Vec<StorageError>) -> StorageResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(StorageError::Joined(errors)),
        }
    }
}

/// Formats a list of errors separated by `"; "`
pub(crate) struct JoinedDisplay<'a, E>(pub &'a [E]);

impl<E: fmt::Display> fmt::Display for JoinedDisplay<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Something that stores key-value pairs
///
/// Reads take `&self` and may run concurrently once the store is
/// finalized. Writes take `&mut self`; callers serialize them.
pub trait KeyValueStore<K, V>: Send + Sync {
    /// Reserves room for `size` entries. May be a no-op.
    fn grow(&mut self, size: u64) -> StorageResult<()>;

    /// Sets `key` to `value`
    fn set(&mut self, key: K, value: V) -> StorageResult<()>;

    /// Retrieves the value for `key`, if any
    fn get(&self, key: &K) -> StorageResult<Option<V>>;

    /// Like `get`, but returns the default value when `key` is absent
    fn get_zero(&self, key: &K) -> StorageResult<V>
    where
        V: Default,
    {
        Ok(self.get(key)?.unwrap_or_default())
    }

    /// Checks if `key` is present
    fn has(&self, key: &K) -> StorageResult<bool>;

    /// Deletes `key`
    fn delete(&mut self, key: &K) -> StorageResult<()>;

    /// Calls `f` for every entry, in no particular order.
    ///
    /// The first error returned by `f` stops the iteration and is returned.
    fn iterate(&self, f: &mut dyn FnMut(K, V) -> StorageResult<()>) -> StorageResult<()>;

    /// Number of entries
    fn count(&self) -> StorageResult<u64>;

    /// Performs backend-specific optimization of internal structures
    fn compact(&mut self) -> StorageResult<()>;

    /// Marks this store read-only
    fn finalize(&mut self) -> StorageResult<()>;

    /// Releases the store. Closing more than once is a no-op.
    fn close(&mut self) -> StorageResult<()>;
}

/// Resolves an insert into an existing `(a, b, c)` entry.
///
/// Receives the stored label and the new one, and returns the label to keep.
pub type ConflictFn<'a> = dyn FnMut(Id, Id) -> StorageResult<Id> + 'a;

/// Pull-based iterator over `(c, label)` pairs of a ternary store
pub type TernaryScan<'a> = Box<dyn Iterator<Item = StorageResult<(Id, Id)>> + 'a>;

/// A store keyed by `(a, b)` mapping to a set of `(c, label)` entries
pub trait TernaryStore: Send + Sync {
    /// Adds the entry `(a, b, c)` with provenance `label`.
    ///
    /// When `(a, b, c)` already exists with a different label, `conflict`
    /// decides which label is kept and `true` is returned.
    fn add(&mut self, a: Id, b: Id, c: Id, label: Id, conflict: &mut ConflictFn<'_>) -> StorageResult<bool>;

    /// Returns the label of `(a, b, c)`, if present
    fn has(&self, a: Id, b: Id, c: Id) -> StorageResult<Option<Id>>;

    /// Iterates over every `(c, label)` stored under `(a, b)`.
    ///
    /// After `finalize`, entries come in ascending `c` order.
    fn scan(&self, a: Id, b: Id) -> StorageResult<TernaryScan<'_>>;

    /// Push-style variant of [`TernaryStore::scan`]
    fn fetch(&self, a: Id, b: Id, f: &mut dyn FnMut(Id, Id) -> StorageResult<()>) -> StorageResult<()> {
        for item in self.scan(a, b)? {
            let (c, label) = item?;
            f(c, label)?;
        }
        Ok(())
    }

    /// Total number of entries
    fn count(&self) -> StorageResult<u64>;

    /// Performs backend-specific optimization of internal structures
    fn compact(&mut self) -> StorageResult<()>;

    /// Marks this store read-only and fixes the scan order
    fn finalize(&mut self) -> StorageResult<()>;

    /// Releases the store. Closing more than once is a no-op.
    fn close(&mut self) -> StorageResult<()>;
}

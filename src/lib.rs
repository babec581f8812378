//! Triplex
//!
//! An embeddable triple store for labeled graphs with attached literal
//! data. Triplex normalizes identical nodes, materializes inverse edges at
//! insert time and answers path queries through a lazy cursor.
//!
//! # Architecture
//!
//! - [`model`]: ids, labels, data and triple records
//! - [`storage`]: key-value and ternary stores, in memory or on RocksDB
//! - [`labels`]: the bidirectional label map with identity merging
//! - [`index`]: the graph index and its path queries
//! - [`loader`]: three-pass bulk loading from N-Quads or memory
//! - [`config`]: index configuration
//!
//! An index is built once and then finalized. A finalized index is
//! read-only and may be queried from many threads at once.
//!
//! ## Example Usage
//!
//! ```rust
//! use triplex::{Index, Label, MemoryEngine};
//!
//! let mut index = Index::new();
//! index.reset(&MemoryEngine).unwrap();
//!
//! let l = |s: &str| Label::new(s);
//! index.add_triple(&l("alice"), &l("type"), &l("person")).unwrap();
//! index.add_triple(&l("alice"), &l("knows"), &l("bob")).unwrap();
//! index.add_data(&l("bob"), &l("name"), "Bob").unwrap();
//! index.finalize().unwrap();
//!
//! let mut paths = index.paths_starting(&l("type"), &l("person")).unwrap();
//! paths.connected(&l("knows")).unwrap().connected(&l("name")).unwrap();
//!
//! let found: Vec<_> = paths.paths().collect::<Result<_, _>>().unwrap();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].to_string(), "alice knows bob name \"Bob\"");
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod index;
pub mod labels;
pub mod loader;
pub mod model;
pub mod storage;

// Re-export main types for convenience
pub use model::{Datum, Id, IdError, IdResult, IndexStats, Label, LabelIds, Role, StoredTriple, Triple};

pub use storage::{
    DiskStore, DiskTernary, KeyValueStore, MemoryStore, MemoryTernary, StorageError, StorageResult,
    TernaryStore,
};

pub use labels::{LabelEngine, LabelMap};

pub use index::{DiskEngine, Engine, Index, IndexError, IndexResult, MemoryEngine, Path, Paths};

pub use loader::{load_index, LoadError, LoadResult, NQuadsSource, Statement, StatementSource, VecSource};

pub use config::{ConfigError, ConfigResult, IndexConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

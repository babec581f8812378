//! Graph index
//!
//! An [`Index`] stores a directed labeled graph with optionally attached
//! data. Triples are kept in two [`TernaryStore`](crate::storage::TernaryStore)s:
//! - PSO: `(predicate, subject) -> object`
//! - POS: `(predicate, object) -> subject`
//!
//! so that paths can be followed in either direction. Queries are built
//! with [`Index::paths_starting`] and refined through [`Paths`].

pub mod engine;
pub mod graph;
pub mod paths;

pub use engine::{DiskEngine, Engine, MemoryEngine};
pub use graph::Index;
pub use paths::{Path, Paths};

use crate::model::{Id, IdError};
use crate::storage::{JoinedDisplay, StorageError};
use thiserror::Error;

/// Index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// Mutation of a finalized index
    #[error("index is finalized")]
    Finalized,

    /// Use of an index that was never reset or has been closed
    #[error("index is not initialized")]
    NotInitialized,

    #[error("triple {0} not found")]
    TripleNotFound(Id),

    /// A sub-store failed
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("{}", JoinedDisplay(.0))]
    Joined(Vec<IndexError>),
}

pub type IndexResult<T> = Result<T, IndexError>;

impl IndexError {
    /// Turns a list of errors into a single result
    pub fn join(mut errors: Vec<IndexError>) -> IndexResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(IndexError::Joined(errors)),
        }
    }
}

/// Attaches context to storage errors
pub(crate) trait StorageContext<T> {
    fn context(self, context: impl Into<String>) -> IndexResult<T>;
}

impl<T> StorageContext<T> for Result<T, StorageError> {
    fn context(self, context: impl Into<String>) -> IndexResult<T> {
        self.map_err(|source| IndexError::Storage {
            context: context.into(),
            source,
        })
    }
}

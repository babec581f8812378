//! Bulk loading
//!
//! [`load_index`] builds a finalized [`Index`] from a [`StatementSource`]
//! in three passes over the source:
//! 1. identity declarations (also counting data statements),
//! 2. inverse declarations,
//! 3. every triple and datum.
//!
//! Identities and inverses must be known before triples reference them,
//! hence the source is replayed.

pub mod source;

pub use source::{NQuadsSource, Statement, StatementSource, VecSource};

use crate::config::{labels, IndexConfig};
use crate::index::{Index, IndexError};
use crate::model::Label;
use rustc_hash::FxHashSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] rio_turtle::TurtleError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Identities,
    Inverses,
    Triples,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Identities => write!(f, "identities"),
            Phase::Inverses => write!(f, "inverses"),
            Phase::Triples => write!(f, "triples"),
        }
    }
}

/// Builds a finalized index from `source`.
///
/// On failure the partially built index is closed.
pub fn load_index(source: &mut dyn StatementSource, config: &IndexConfig) -> LoadResult<Index> {
    let mut index = Index::new();
    index.reset(config.engine().as_ref())?;

    match build(&mut index, source, config) {
        Ok(()) => Ok(index),
        Err(err) => {
            if let Err(close) = index.close() {
                warn!("failed to close index after load error: {}", close);
            }
            Err(err)
        }
    }
}

fn build(index: &mut Index, source: &mut dyn StatementSource, config: &IndexConfig) -> LoadResult<()> {
    if let Some(mask) = &config.predicate_mask {
        index.set_predicate_mask(&labels(mask))?;
    }
    if let Some(mask) = &config.data_mask {
        index.set_data_mask(&labels(mask))?;
    }

    let same_as: FxHashSet<Label> = labels(&config.same_as).into_iter().collect();
    let mut data = 0u64;
    let total = run_phase(index, source, config, Phase::Identities, |index, statement| {
        match statement {
            Statement::Link {
                subject,
                predicate,
                object,
            } if same_as.contains(&predicate) => {
                index.mark_identical(&subject, &object)?;
            }
            Statement::Link { .. } => {}
            Statement::Data { .. } => data += 1,
        }
        Ok(())
    })?;
    debug!(total, data, "counted statements");

    if !config.inverse_of.is_empty() {
        let inverse_of: FxHashSet<Label> = labels(&config.inverse_of).into_iter().collect();
        run_phase(index, source, config, Phase::Inverses, |index, statement| {
            if let Statement::Link {
                subject,
                predicate,
                object,
            } = statement
            {
                if inverse_of.contains(&predicate) {
                    index.mark_inverse(&subject, &object)?;
                }
            }
            Ok(())
        })?;
    }

    index.grow(data)?;
    run_phase(index, source, config, Phase::Triples, |index, statement| {
        match statement {
            Statement::Link {
                subject,
                predicate,
                object,
            } => index.add_triple(&subject, &predicate, &object)?,
            Statement::Data {
                subject,
                predicate,
                datum,
            } => index.add_datum(&subject, &predicate, &datum)?,
        }
        Ok(())
    })?;

    index.finalize()?;
    info!(statements = total, stats = %index.stats(), "index loaded");
    Ok(())
}

/// Feeds every statement to `f`, compacting periodically and at the end
fn run_phase(
    index: &mut Index,
    source: &mut dyn StatementSource,
    config: &IndexConfig,
    phase: Phase,
    mut f: impl FnMut(&mut Index, Statement) -> LoadResult<()>,
) -> LoadResult<usize> {
    debug!(%phase, "starting phase");

    let mut count = 0usize;
    source.scan(&mut |statement| {
        f(index, statement)?;
        count += 1;
        if config.should_compact(count) {
            index.compact()?;
        }
        Ok(())
    })?;
    index.compact()?;

    debug!(%phase, count, stats = %index.stats(), "finished phase");
    Ok(count)
}

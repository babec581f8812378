//! Index configuration

use crate::index::{DiskEngine, Engine, MemoryEngine};
use crate::model::Label;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How an index is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory for disk stores (None = in-memory only)
    pub data_path: Option<PathBuf>,
    /// Predicates declaring two nodes identical
    pub same_as: Vec<String>,
    /// Predicates declaring two predicates inverse
    pub inverse_of: Vec<String>,
    /// Statements between compactions while loading (0 = never)
    pub compact_interval: usize,
    /// Only index these predicates
    pub predicate_mask: Option<Vec<String>>,
    /// Only index data under these predicates
    pub data_mask: Option<Vec<String>>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            same_as: vec!["http://www.w3.org/2002/07/owl#sameAs".to_string()],
            inverse_of: vec!["http://www.w3.org/2002/07/owl#inverseOf".to_string()],
            compact_interval: 100_000,
            predicate_mask: None,
            data_mask: None,
        }
    }
}

impl IndexConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Engine for the configured storage location
    pub fn engine(&self) -> Box<dyn Engine> {
        match &self.data_path {
            Some(path) => Box::new(DiskEngine::new(path)),
            None => Box::new(MemoryEngine),
        }
    }

    pub(crate) fn should_compact(&self, count: usize) -> bool {
        self.compact_interval > 0 && count > 0 && count % self.compact_interval == 0
    }
}

/// Converts configured predicate names into labels
pub(crate) fn labels(names: &[String]) -> Vec<Label> {
    names.iter().map(Label::from).collect()
}

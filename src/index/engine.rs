//! Storage engines
//!
//! An [`Engine`] creates every store an [`Index`](super::Index) needs.

use crate::labels::{ForwardStore, LabelEngine, ReverseStore};
use crate::model::{Id, Label, LabelIds, StoredTriple};
use crate::storage::{
    Codec, DiskStore, DiskTernary, KeyValueStore, MemoryStore, MemoryTernary, StorageResult, TernaryStore,
};
use std::path::PathBuf;

/// Datum values or language tags, keyed by datum id
pub type DataStore = Box<dyn KeyValueStore<Id, String>>;

/// Inverse predicate, keyed by predicate
pub type InverseStore = Box<dyn KeyValueStore<Id, Id>>;

/// Triple records, keyed by triple id
pub type TripleStore = Box<dyn KeyValueStore<Id, StoredTriple>>;

pub type TernaryIndex = Box<dyn TernaryStore>;

/// Creates the stores of an index
pub trait Engine: LabelEngine {
    fn data(&self) -> StorageResult<DataStore>;
    fn languages(&self) -> StorageResult<DataStore>;
    fn inverses(&self) -> StorageResult<InverseStore>;
    fn triples(&self) -> StorageResult<TripleStore>;
    fn pso(&self) -> StorageResult<TernaryIndex>;
    fn pos(&self) -> StorageResult<TernaryIndex>;
}

/// Keeps everything in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryEngine;

impl LabelEngine for MemoryEngine {
    fn forward(&self) -> StorageResult<ForwardStore> {
        Ok(Box::new(MemoryStore::<Label, LabelIds>::new()))
    }

    fn reverse(&self) -> StorageResult<ReverseStore> {
        Ok(Box::new(MemoryStore::<Id, Label>::new()))
    }
}

impl Engine for MemoryEngine {
    fn data(&self) -> StorageResult<DataStore> {
        Ok(Box::new(MemoryStore::<Id, String>::new()))
    }

    fn languages(&self) -> StorageResult<DataStore> {
        Ok(Box::new(MemoryStore::<Id, String>::new()))
    }

    fn inverses(&self) -> StorageResult<InverseStore> {
        Ok(Box::new(MemoryStore::<Id, Id>::new()))
    }

    fn triples(&self) -> StorageResult<TripleStore> {
        Ok(Box::new(MemoryStore::<Id, StoredTriple>::new()))
    }

    fn pso(&self) -> StorageResult<TernaryIndex> {
        Ok(Box::new(MemoryTernary::new()))
    }

    fn pos(&self) -> StorageResult<TernaryIndex> {
        Ok(Box::new(MemoryTernary::new()))
    }
}

/// Keeps every store in its own RocksDB directory below `path`.
///
/// Existing stores at these locations are wiped when opened.
#[derive(Debug, Clone)]
pub struct DiskEngine {
    pub path: PathBuf,
}

impl DiskEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory of the store called `name`
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{}.rocksdb", name))
    }
}

impl LabelEngine for DiskEngine {
    fn forward(&self) -> StorageResult<ForwardStore> {
        Ok(Box::new(DiskStore::open_with(
            self.store_path("forward"),
            Codec::label(),
            Codec::label_ids(),
        )?))
    }

    fn reverse(&self) -> StorageResult<ReverseStore> {
        Ok(Box::new(DiskStore::open_with(self.store_path("reverse"), Codec::id(), Codec::label())?))
    }
}

impl Engine for DiskEngine {
    fn data(&self) -> StorageResult<DataStore> {
        Ok(Box::new(DiskStore::open_with(self.store_path("data"), Codec::id(), Codec::utf8())?))
    }

    fn languages(&self) -> StorageResult<DataStore> {
        Ok(Box::new(DiskStore::open_with(self.store_path("languages"), Codec::id(), Codec::utf8())?))
    }

    fn inverses(&self) -> StorageResult<InverseStore> {
        Ok(Box::new(DiskStore::open_with(self.store_path("inverses"), Codec::id(), Codec::id())?))
    }

    fn triples(&self) -> StorageResult<TripleStore> {
        Ok(Box::new(DiskStore::open_with(
            self.store_path("triples"),
            Codec::id(),
            Codec::stored_triple(),
        )?))
    }

    fn pso(&self) -> StorageResult<TernaryIndex> {
        Ok(Box::new(DiskTernary::open(self.store_path("pso"))?))
    }

    fn pos(&self) -> StorageResult<TernaryIndex> {
        Ok(Box::new(DiskTernary::open(self.store_path("pos"))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disk_engine_layout() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DiskEngine::new(temp_dir.path());

        let _pso = engine.pso().unwrap();
        let _triples = engine.triples().unwrap();
        let _forward = engine.forward().unwrap();

        for name in ["pso", "triples", "forward"] {
            assert!(engine.store_path(name).is_dir(), "{} was not created", name);
        }
        assert_eq!(engine.store_path("pos"), temp_dir.path().join("pos.rocksdb"));
    }

    #[test]
    fn test_disk_text_stores_hold_plain_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DiskEngine::new(temp_dir.path());
        let id = Id::from_u64(1).unwrap();

        for (name, mut store) in [("data", engine.data().unwrap()), ("languages", engine.languages().unwrap())] {
            store.set(id, "en".to_string()).unwrap();
            store.finalize().unwrap();
            assert_eq!(store.get(&id).unwrap(), Some("en".to_string()));
            store.close().unwrap();

            let db = rocksdb::DB::open_for_read_only(&rocksdb::Options::default(), engine.store_path(name), false)
                .unwrap();
            let values: Vec<Vec<u8>> = db
                .iterator(rocksdb::IteratorMode::Start)
                .map(|item| item.unwrap().1.to_vec())
                .collect();
            assert_eq!(values, vec![b"en".to_vec()], "{} is not stored as utf8", name);
        }
    }
}

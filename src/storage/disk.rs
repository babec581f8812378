//! RocksDB-backed stores
//!
//! Every store owns its own database directory. Opening a store wipes any
//! existing data at its path. Finalizing compacts and flushes the
//! database, then reopens it read-only.

use super::{
    Codec, ConflictFn, KeyValueStore, StorageError, StorageResult, TernaryScan, TernaryStore,
};
use crate::model::{decode_id_at, encode_ids, Id};
use rocksdb::{Direction, IteratorMode, Options, ReadOptions, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Database handle shared by both disk store kinds
struct Handle {
    db: Option<DB>,
    path: PathBuf,
    name: String,
    finalized: bool,
}

impl Handle {
    fn open(path: &Path) -> StorageResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if path.exists() {
            debug!("Removing existing store at {}", path.display());
            fs::remove_dir_all(path).map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        info!("Opening disk store at: {}", path.display());
        let db = DB::open(&Self::options(), path).map_err(|e| StorageError::backend(&name, "open", e))?;

        Ok(Self {
            db: Some(db),
            path: path.to_path_buf(),
            name,
            finalized: false,
        })
    }

    fn options() -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // bulk loading is write heavy
        opts.set_write_buffer_size(64 * 1024 * 1024); // 64 MB
        opts.set_max_write_buffer_number(3);
        opts.set_min_write_buffer_number_to_merge(1);

        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn db(&self) -> StorageResult<&DB> {
        self.db.as_ref().ok_or(StorageError::Closed)
    }

    fn writable(&self) -> StorageResult<&DB> {
        if self.finalized {
            return Err(StorageError::Finalized);
        }
        self.db()
    }

    fn err(&self, op: &'static str) -> impl FnOnce(rocksdb::Error) -> StorageError + '_ {
        move |e| StorageError::backend(&self.name, op, e)
    }

    fn compact(&self) -> StorageResult<()> {
        let db = self.writable()?;
        db.flush().map_err(self.err("flush"))?;
        db.compact_range(None::<&[u8]>, None::<&[u8]>);
        Ok(())
    }

    fn finalize(&mut self) -> StorageResult<()> {
        self.compact()?;

        // drop the writable handle before reopening
        self.db = None;
        let db = DB::open_for_read_only(&Self::options(), &self.path, false).map_err(self.err("reopen"))?;
        self.db = Some(db);
        self.finalized = true;

        debug!("Finalized disk store {}", self.name);
        Ok(())
    }

    fn close(&mut self) {
        if self.db.take().is_some() {
            debug!("Closed disk store {}", self.name);
        }
    }

    fn count(&self) -> StorageResult<u64> {
        let mut count = 0;
        for item in self.db()?.iterator(IteratorMode::Start) {
            item.map_err(self.err("count"))?;
            count += 1;
        }
        Ok(count)
    }
}

/// RocksDB backed [`KeyValueStore`]
pub struct DiskStore<K, V> {
    handle: Handle,
    keys: Codec<K>,
    values: Codec<V>,
}

impl<K, V> DiskStore<K, V>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Opens a store at `path` using bincode for keys and values
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with(path, Codec::bincode(), Codec::bincode())
    }
}

impl<K, V> DiskStore<K, V> {
    /// Opens a store at `path` with explicit codecs
    pub fn open_with(path: impl AsRef<Path>, keys: Codec<K>, values: Codec<V>) -> StorageResult<Self> {
        Ok(Self {
            handle: Handle::open(path.as_ref())?,
            keys,
            values,
        })
    }
}

impl<K, V> KeyValueStore<K, V> for DiskStore<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
    fn grow(&mut self, _size: u64) -> StorageResult<()> {
        self.handle.writable().map(|_| ())
    }

    fn set(&mut self, key: K, value: V) -> StorageResult<()> {
        let db = self.handle.writable()?;
        db.put((self.keys.encode)(&key)?, (self.values.encode)(&value)?)
            .map_err(self.handle.err("set"))
    }

    fn get(&self, key: &K) -> StorageResult<Option<V>> {
        let db = self.handle.db()?;
        match db.get_pinned((self.keys.encode)(key)?).map_err(self.handle.err("get"))? {
            Some(bytes) => Ok(Some((self.values.decode)(&bytes)?)),
            None => Ok(None),
        }
    }

    fn has(&self, key: &K) -> StorageResult<bool> {
        let db = self.handle.db()?;
        Ok(db
            .get_pinned((self.keys.encode)(key)?)
            .map_err(self.handle.err("has"))?
            .is_some())
    }

    fn delete(&mut self, key: &K) -> StorageResult<()> {
        let db = self.handle.writable()?;
        db.delete((self.keys.encode)(key)?).map_err(self.handle.err("delete"))
    }

    fn iterate(&self, f: &mut dyn FnMut(K, V) -> StorageResult<()>) -> StorageResult<()> {
        for item in self.handle.db()?.iterator(IteratorMode::Start) {
            let (key, value) = item.map_err(self.handle.err("iterate"))?;
            f((self.keys.decode)(&key)?, (self.values.decode)(&value)?)?;
        }
        Ok(())
    }

    fn count(&self) -> StorageResult<u64> {
        self.handle.count()
    }

    fn compact(&mut self) -> StorageResult<()> {
        self.handle.compact()
    }

    fn finalize(&mut self) -> StorageResult<()> {
        self.handle.finalize()
    }

    fn close(&mut self) -> StorageResult<()> {
        self.handle.close();
        Ok(())
    }
}

/// RocksDB backed [`TernaryStore`]
///
/// Keys are `a ‖ b ‖ c`, values the encoded label. Since ids encode
/// big-endian, a prefix scan over `a ‖ b` yields entries in `c` order.
pub struct DiskTernary {
    handle: Handle,
}

impl DiskTernary {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self {
            handle: Handle::open(path.as_ref())?,
        })
    }
}

impl TernaryStore for DiskTernary {
    fn add(&mut self, a: Id, b: Id, c: Id, label: Id, conflict: &mut ConflictFn<'_>) -> StorageResult<bool> {
        let db = self.handle.writable()?;
        let key = encode_ids(&[a, b, c]);

        match db.get_pinned(&key).map_err(self.handle.err("add"))? {
            Some(bytes) => {
                let old = Id::decode(&bytes)?;
                if old == label {
                    return Ok(false);
                }
                let keep = conflict(old, label)?;
                db.put(&key, keep.as_bytes()).map_err(self.handle.err("add"))?;
                Ok(true)
            }
            None => {
                db.put(&key, label.as_bytes()).map_err(self.handle.err("add"))?;
                Ok(false)
            }
        }
    }

    fn has(&self, a: Id, b: Id, c: Id) -> StorageResult<Option<Id>> {
        let db = self.handle.db()?;
        match db.get_pinned(encode_ids(&[a, b, c])).map_err(self.handle.err("has"))? {
            Some(bytes) => Ok(Some(Id::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan(&self, a: Id, b: Id) -> StorageResult<TernaryScan<'_>> {
        let db = self.handle.db()?;
        let prefix = encode_ids(&[a, b]);

        let mut opts = ReadOptions::default();
        opts.set_iterate_range(rocksdb::PrefixRange(prefix.clone()));
        let iter = db.iterator_opt(IteratorMode::From(&prefix, Direction::Forward), opts);

        let name = self.handle.name.as_str();
        Ok(Box::new(
            iter.take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&prefix),
                Err(_) => true,
            })
            .map(move |item| {
                let (key, value) = item.map_err(|e| StorageError::backend(name, "scan", e))?;
                Ok((decode_id_at(&key, 2)?, Id::decode(&value)?))
            }),
        ))
    }

    fn count(&self) -> StorageResult<u64> {
        self.handle.count()
    }

    fn compact(&mut self) -> StorageResult<()> {
        self.handle.compact()
    }

    fn finalize(&mut self) -> StorageResult<()> {
        self.handle.finalize()
    }

    fn close(&mut self) -> StorageResult<()> {
        self.handle.close();
        Ok(())
    }
}

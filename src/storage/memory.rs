//! In-memory stores

use super::{ConflictFn, KeyValueStore, StorageError, StorageResult, TernaryScan, TernaryStore};
use crate::model::Id;
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Hash map backed [`KeyValueStore`]
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    map: Option<FxHashMap<K, V>>,
    finalized: bool,
}

impl<K, V> MemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            map: Some(FxHashMap::default()),
            finalized: false,
        }
    }

    fn map(&self) -> StorageResult<&FxHashMap<K, V>> {
        self.map.as_ref().ok_or(StorageError::Closed)
    }

    fn map_mut(&mut self) -> StorageResult<&mut FxHashMap<K, V>> {
        if self.finalized {
            return Err(StorageError::Finalized);
        }
        self.map.as_mut().ok_or(StorageError::Closed)
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyValueStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn grow(&mut self, size: u64) -> StorageResult<()> {
        let map = self.map_mut()?;
        // a hint only; failing to reserve is not an error
        let _ = map.try_reserve(usize::try_from(size).unwrap_or(usize::MAX).saturating_sub(map.len()));
        Ok(())
    }

    fn set(&mut self, key: K, value: V) -> StorageResult<()> {
        self.map_mut()?.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> StorageResult<Option<V>> {
        Ok(self.map()?.get(key).cloned())
    }

    fn has(&self, key: &K) -> StorageResult<bool> {
        Ok(self.map()?.contains_key(key))
    }

    fn delete(&mut self, key: &K) -> StorageResult<()> {
        self.map_mut()?.remove(key);
        Ok(())
    }

    fn iterate(&self, f: &mut dyn FnMut(K, V) -> StorageResult<()>) -> StorageResult<()> {
        for (key, value) in self.map()? {
            f(key.clone(), value.clone())?;
        }
        Ok(())
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(self.map()?.len() as u64)
    }

    fn compact(&mut self) -> StorageResult<()> {
        self.map_mut()?.shrink_to_fit();
        Ok(())
    }

    fn finalize(&mut self) -> StorageResult<()> {
        self.map_mut()?.shrink_to_fit();
        self.finalized = true;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.map = None;
        Ok(())
    }
}

/// Entries below one `(a, b)` pair
#[derive(Debug, Default)]
struct TernaryItem {
    data: FxHashMap<Id, Id>,
    /// Sorted keys of `data`, built on finalize
    keys: Vec<Id>,
}

impl TernaryItem {
    fn seal(&mut self) {
        self.data.shrink_to_fit();
        self.keys = self.data.keys().copied().collect();
        self.keys.sort_unstable();
    }
}

/// Nested hash map backed [`TernaryStore`]
#[derive(Debug)]
pub struct MemoryTernary {
    map: Option<FxHashMap<Id, FxHashMap<Id, TernaryItem>>>,
    finalized: bool,
}

impl MemoryTernary {
    pub fn new() -> Self {
        Self {
            map: Some(FxHashMap::default()),
            finalized: false,
        }
    }

    fn map(&self) -> StorageResult<&FxHashMap<Id, FxHashMap<Id, TernaryItem>>> {
        self.map.as_ref().ok_or(StorageError::Closed)
    }

    fn map_mut(&mut self) -> StorageResult<&mut FxHashMap<Id, FxHashMap<Id, TernaryItem>>> {
        if self.finalized {
            return Err(StorageError::Finalized);
        }
        self.map.as_mut().ok_or(StorageError::Closed)
    }
}

impl Default for MemoryTernary {
    fn default() -> Self {
        Self::new()
    }
}

impl TernaryStore for MemoryTernary {
    fn add(&mut self, a: Id, b: Id, c: Id, label: Id, conflict: &mut ConflictFn<'_>) -> StorageResult<bool> {
        let item = self.map_mut()?.entry(a).or_default().entry(b).or_default();

        match item.data.get(&c).copied() {
            Some(old) if old != label => {
                let keep = conflict(old, label)?;
                item.data.insert(c, keep);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                item.data.insert(c, label);
                Ok(false)
            }
        }
    }

    fn has(&self, a: Id, b: Id, c: Id) -> StorageResult<Option<Id>> {
        Ok(self
            .map()?
            .get(&a)
            .and_then(|inner| inner.get(&b))
            .and_then(|item| item.data.get(&c))
            .copied())
    }

    fn scan(&self, a: Id, b: Id) -> StorageResult<TernaryScan<'_>> {
        let Some(item) = self.map()?.get(&a).and_then(|inner| inner.get(&b)) else {
            return Ok(Box::new(std::iter::empty()));
        };

        if self.finalized {
            return Ok(Box::new(
                item.keys
                    .iter()
                    .filter_map(move |c| item.data.get(c).map(|label| Ok((*c, *label)))),
            ));
        }

        // not sealed yet; sort a snapshot
        let mut entries: Vec<(Id, Id)> = item.data.iter().map(|(c, label)| (*c, *label)).collect();
        entries.sort_unstable();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(self
            .map()?
            .values()
            .flat_map(|inner| inner.values())
            .map(|item| item.data.len() as u64)
            .sum())
    }

    fn compact(&mut self) -> StorageResult<()> {
        let map = self.map_mut()?;
        for inner in map.values_mut() {
            for item in inner.values_mut() {
                item.data.shrink_to_fit();
            }
            inner.shrink_to_fit();
        }
        map.shrink_to_fit();
        Ok(())
    }

    fn finalize(&mut self) -> StorageResult<()> {
        let map = self.map_mut()?;
        for inner in map.values_mut() {
            for item in inner.values_mut() {
                item.seal();
            }
        }
        self.finalized = true;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.map = None;
        Ok(())
    }
}

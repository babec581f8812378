//! Label map
//!
//! A [`LabelMap`] holds the forward mapping from labels to their
//! [`LabelIds`] and the reverse mapping from literal ids back to labels.
//! Identity merging rewrites canonical ids only; literal ids are permanent.
//!
//! The map may be read concurrently. Mutating calls take `&mut self`.
//! A fresh map is not ready for use until [`LabelMap::reset`] is called.

use crate::model::{Id, Label};
use crate::storage::{fan_out, KeyValueStore, StorageError, StorageResult, Task};
use tracing::debug;

pub use crate::model::LabelIds;

/// Forward mapping store
pub type ForwardStore = Box<dyn KeyValueStore<Label, LabelIds>>;

/// Reverse mapping store
pub type ReverseStore = Box<dyn KeyValueStore<Id, Label>>;

/// Creates the stores backing a [`LabelMap`]
pub trait LabelEngine {
    fn forward(&self) -> StorageResult<ForwardStore>;
    fn reverse(&self) -> StorageResult<ReverseStore>;
}

/// Bidirectional mapping between labels and ids
#[derive(Default)]
pub struct LabelMap {
    forward: Option<ForwardStore>,
    reverse: Option<ReverseStore>,
    finalized: bool,
    /// Last id handed out
    id: Id,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties this map and opens fresh stores from `engine`.
    ///
    /// Any previously opened stores are closed first.
    pub fn reset<E: LabelEngine + ?Sized>(&mut self, engine: &E) -> StorageResult<()> {
        self.close()?;

        let mut forward = engine.forward()?;
        let reverse = match engine.reverse() {
            Ok(reverse) => reverse,
            Err(err) => {
                let mut errors = vec![err];
                if let Err(close) = forward.close() {
                    errors.push(close);
                }
                return StorageError::join(errors);
            }
        };

        self.forward = Some(forward);
        self.reverse = Some(reverse);
        self.id.reset();
        self.finalized = false;
        debug!("Label map reset");
        Ok(())
    }

    fn stores(&self) -> StorageResult<(&dyn KeyValueStore<Label, LabelIds>, &dyn KeyValueStore<Id, Label>)> {
        match (&self.forward, &self.reverse) {
            (Some(forward), Some(reverse)) => Ok((forward.as_ref(), reverse.as_ref())),
            _ => Err(StorageError::Closed),
        }
    }

    #[allow(clippy::type_complexity)]
    fn stores_mut(
        &mut self,
    ) -> StorageResult<(&mut dyn KeyValueStore<Label, LabelIds>, &mut dyn KeyValueStore<Id, Label>)> {
        if self.finalized {
            return Err(StorageError::Finalized);
        }
        match (&mut self.forward, &mut self.reverse) {
            (Some(forward), Some(reverse)) => Ok((forward.as_mut(), reverse.as_mut())),
            _ => Err(StorageError::Closed),
        }
    }

    /// Allocates an id that is not bound to any label
    pub fn next(&mut self) -> StorageResult<Id> {
        Ok(self.id.inc()?)
    }

    /// Returns the ids of `label`, creating them if needed
    pub fn add(&mut self, label: &Label) -> StorageResult<LabelIds> {
        self.add_new(label).map(|(ids, _)| ids)
    }

    /// Like [`LabelMap::add`], but also reports if `label` existed before
    pub fn add_new(&mut self, label: &Label) -> StorageResult<(LabelIds, bool)> {
        let existing = self.stores_mut()?.0.get(label)?;
        if let Some(ids) = existing {
            return Ok((ids, true));
        }

        let ids = LabelIds::fresh(self.id.inc()?);
        let (forward, reverse) = self.stores_mut()?;
        forward.set(label.clone(), ids)?;
        reverse.set(ids.literal, label.clone())?;
        Ok((ids, false))
    }

    /// Looks up `label` without modifying the map
    pub fn get(&self, label: &Label) -> StorageResult<Option<LabelIds>> {
        self.stores()?.0.get(label)
    }

    /// Canonical id of `label`, or [`Id::ZERO`] if it is unknown
    pub fn forward(&self, label: &Label) -> StorageResult<Id> {
        Ok(self.stores()?.0.get_zero(label)?.canonical)
    }

    /// Label with literal id `id`, or the empty label if there is none
    pub fn reverse(&self, id: Id) -> StorageResult<Label> {
        self.stores()?.1.get_zero(&id)
    }

    /// Marks `old` as identical to `same` and returns the canonical id of `same`.
    ///
    /// Afterwards, `old` and everything previously identical to it resolve
    /// to that id. When `old` was already known this walks the entire
    /// forward map, so identities should be declared before bulk loading.
    pub fn mark_identical(&mut self, same: &Label, old: &Label) -> StorageResult<Id> {
        let canonical = self.add(same)?.canonical;
        let (mut alias, existed) = self.add_new(old)?;

        if alias.canonical == canonical {
            return Ok(canonical);
        }

        let (forward, _) = self.stores_mut()?;

        // nothing can refer to a fresh alias yet
        if !existed {
            alias.canonical = canonical;
            forward.set(old.clone(), alias)?;
            return Ok(canonical);
        }

        let previous = alias.canonical;
        let mut rewrites = Vec::new();
        forward.iterate(&mut |label, ids| {
            if ids.canonical == previous && &label != same {
                rewrites.push((label, ids));
            }
            Ok(())
        })?;

        for (label, mut ids) in rewrites {
            ids.canonical = canonical;
            forward.set(label, ids)?;
        }
        Ok(canonical)
    }

    /// Writes every label that resolves to a different label into `sink`.
    ///
    /// A pair `(l1, l2)` is written iff `reverse(forward(l1)) == l2` and `l1 != l2`.
    pub fn identity_map(&self, sink: &mut dyn KeyValueStore<Label, Label>) -> StorageResult<()> {
        let (forward, reverse) = self.stores()?;
        forward.iterate(&mut |label, ids| {
            let value = reverse.get_zero(&ids.canonical)?;
            if value != label {
                sink.set(label, value)?;
            }
            Ok(())
        })
    }

    pub fn compact(&mut self) -> StorageResult<()> {
        let (forward, reverse) = self.stores_mut()?;
        StorageError::join(fan_out(vec![
            Box::new(move || forward.compact()) as Task<'_, StorageError>,
            Box::new(move || reverse.compact()),
        ]))
    }

    /// Makes this map read-only. Fails when called twice.
    pub fn finalize(&mut self) -> StorageResult<()> {
        let (forward, reverse) = self.stores_mut()?;
        let result = StorageError::join(fan_out(vec![
            Box::new(move || forward.finalize()) as Task<'_, StorageError>,
            Box::new(move || reverse.finalize()),
        ]));
        self.finalized = true;
        result
    }

    /// Closes the underlying stores. Closing more than once is a no-op.
    pub fn close(&mut self) -> StorageResult<()> {
        let mut errors = Vec::new();
        if let Some(mut forward) = self.forward.take() {
            if let Err(err) = forward.close() {
                errors.push(err);
            }
        }
        if let Some(mut reverse) = self.reverse.take() {
            if let Err(err) = reverse.close() {
                errors.push(err);
            }
        }
        StorageError::join(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DiskEngine, MemoryEngine};
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    fn l(s: impl ToString) -> Label {
        Label::new(s.to_string())
    }

    fn id(n: u64) -> Id {
        Id::from_u64(n).unwrap()
    }

    fn new_map(engine: &dyn LabelEngine) -> LabelMap {
        let mut map = LabelMap::new();
        map.reset(engine).unwrap();
        map
    }

    #[test]
    fn test_add_and_lookup() {
        let mut map = new_map(&MemoryEngine);

        for (i, word) in ["hello", "world", "earth"].iter().enumerate() {
            assert_eq!(map.add(&l(word)).unwrap().canonical, id(i as u64 + 1));
        }
        for (i, word) in ["hello", "world", "earth"].iter().enumerate() {
            assert_eq!(map.add(&l(word)).unwrap().canonical, id(i as u64 + 1));
            assert_eq!(map.forward(&l(word)).unwrap(), id(i as u64 + 1));
            assert_eq!(map.reverse(id(i as u64 + 1)).unwrap(), l(word));
        }

        map.mark_identical(&l("earth"), &l("world")).unwrap();

        // literal ids stay, canonical ids move
        assert_eq!(map.reverse(id(1)).unwrap(), l("hello"));
        assert_eq!(map.reverse(id(2)).unwrap(), l("world"));
        assert_eq!(map.reverse(id(3)).unwrap(), l("earth"));
        assert_eq!(map.add(&l("hello")).unwrap().canonical, id(1));
        assert_eq!(map.add(&l("world")).unwrap(), LabelIds { canonical: id(3), literal: id(2) });
        assert_eq!(map.add(&l("earth")).unwrap().canonical, id(3));
    }

    #[test]
    fn test_not_found() {
        let mut map = new_map(&MemoryEngine);
        map.add(&l("a")).unwrap();

        assert_eq!(map.forward(&l("b")).unwrap(), Id::ZERO);
        assert_eq!(map.reverse(id(99)).unwrap(), Label::default());
        assert_eq!(map.get(&l("b")).unwrap(), None);
        assert_eq!(map.get(&l("a")).unwrap(), Some(LabelIds::fresh(id(1))));

        // get does not allocate
        assert_eq!(map.add(&l("b")).unwrap().literal, id(2));
    }

    #[test]
    fn test_add_new_and_next() {
        let mut map = new_map(&MemoryEngine);
        assert_eq!(map.add_new(&l("a")).unwrap(), (LabelIds::fresh(id(1)), false));
        assert_eq!(map.add_new(&l("a")).unwrap(), (LabelIds::fresh(id(1)), true));

        assert_eq!(map.next().unwrap(), id(2));
        assert_eq!(map.add(&l("b")).unwrap().literal, id(3));
        assert_eq!(map.reverse(id(2)).unwrap(), Label::default());
    }

    #[test]
    fn test_identity_closure() {
        let mut map = new_map(&MemoryEngine);
        map.add(&l("b")).unwrap();
        map.add(&l("c")).unwrap();

        // c joins b, then b (and with it c) joins a
        map.mark_identical(&l("b"), &l("c")).unwrap();
        let a = map.mark_identical(&l("a"), &l("b")).unwrap();

        assert_eq!(map.forward(&l("b")).unwrap(), a);
        assert_eq!(map.forward(&l("c")).unwrap(), a);
        assert_eq!(map.forward(&l("a")).unwrap(), a);

        // marking again is a no-op
        assert_eq!(map.mark_identical(&l("a"), &l("c")).unwrap(), a);
    }

    #[test]
    fn test_identity_map() {
        let mut map = new_map(&MemoryEngine);
        map.add(&l("x")).unwrap();
        map.mark_identical(&l("a"), &l("b")).unwrap();
        map.mark_identical(&l("a"), &l("c")).unwrap();

        let mut sink: MemoryStore<Label, Label> = MemoryStore::new();
        map.identity_map(&mut sink).unwrap();

        assert_eq!(sink.count().unwrap(), 2);
        assert_eq!(sink.get(&l("b")).unwrap(), Some(l("a")));
        assert_eq!(sink.get(&l("c")).unwrap(), Some(l("a")));
        assert!(!sink.has(&l("x")).unwrap());
    }

    #[test]
    fn test_finalize() {
        let mut map = new_map(&MemoryEngine);
        map.add(&l("a")).unwrap();
        map.compact().unwrap();
        map.finalize().unwrap();

        assert!(matches!(map.add(&l("b")), Err(StorageError::Finalized)));
        assert!(matches!(map.mark_identical(&l("a"), &l("b")), Err(StorageError::Finalized)));
        assert!(matches!(map.compact(), Err(StorageError::Finalized)));
        assert!(matches!(map.finalize(), Err(StorageError::Finalized)));
        assert_eq!(map.forward(&l("a")).unwrap(), id(1));

        map.close().unwrap();
        map.close().unwrap();
        assert!(matches!(map.forward(&l("a")), Err(StorageError::Closed)));
    }

    #[test]
    fn test_uninitialized() {
        let mut map = LabelMap::new();
        assert!(matches!(map.add(&l("a")), Err(StorageError::Closed)));
        assert!(map.close().is_ok());
    }

    fn check_pairs(engine: &dyn LabelEngine, n: u64) {
        let mut map = new_map(engine);

        // make i == i + 1
        for i in (0..n).step_by(2) {
            assert_eq!(map.mark_identical(&l(i), &l(i + 1)).unwrap(), id(i + 1));
        }
        for i in 0..n {
            assert_eq!(map.forward(&l(i)).unwrap(), id(i - (i % 2) + 1));
        }
        for i in 1..n {
            assert_eq!(map.reverse(id(i)).unwrap(), l(i - 1));
        }

        map.close().unwrap();
    }

    #[test]
    fn test_memory_pairs() {
        check_pairs(&MemoryEngine, 100_000);
    }

    #[test]
    fn test_disk_pairs() {
        let temp_dir = TempDir::new().unwrap();
        check_pairs(&DiskEngine::new(temp_dir.path()), 10_000);
    }
}

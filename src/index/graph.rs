//! The triple index

use super::engine::{DataStore, Engine, InverseStore, TernaryIndex, TripleStore};
use super::{IndexError, IndexResult, StorageContext};
use crate::labels::LabelMap;
use crate::model::{Datum, Id, IndexStats, Label, LabelIds, Role, StoredTriple, Triple};
use crate::storage::{fan_out, KeyValueStore, StorageError, StorageResult, Task, TernaryStore};
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

/// Stores owned by an initialized index
struct Stores {
    data: DataStore,
    languages: DataStore,
    inverses: InverseStore,
    triples: TripleStore,
    pso: TernaryIndex,
    pos: TernaryIndex,
}

impl Stores {
    fn open(engine: &dyn Engine) -> IndexResult<Self> {
        // stores opened before a failure are released on drop
        Ok(Self {
            data: engine.data().context("failed to initialize data")?,
            languages: engine.languages().context("failed to initialize languages")?,
            inverses: engine.inverses().context("failed to initialize inverses")?,
            triples: engine.triples().context("failed to initialize triples")?,
            pso: engine.pso().context("failed to initialize pso index")?,
            pos: engine.pos().context("failed to initialize pos index")?,
        })
    }

    fn close(&mut self) -> Vec<IndexError> {
        let results = [
            self.data.close().context("failed to close data"),
            self.languages.close().context("failed to close languages"),
            self.inverses.close().context("failed to close inverses"),
            self.triples.close().context("failed to close triples"),
            self.pso.close().context("failed to close pso index"),
            self.pos.close().context("failed to close pos index"),
        ];
        results.into_iter().filter_map(Result::err).collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Maintenance {
    Compact,
    Finalize,
}

impl Maintenance {
    fn context(self, store: &str) -> String {
        match self {
            Maintenance::Compact => format!("failed to compact {}", store),
            Maintenance::Finalize => format!("failed to finalize {}", store),
        }
    }

    fn store<K, V>(self, store: &mut dyn KeyValueStore<K, V>) -> StorageResult<()> {
        match self {
            Maintenance::Compact => store.compact(),
            Maintenance::Finalize => store.finalize(),
        }
    }

    fn ternary(self, store: &mut dyn TernaryStore) -> StorageResult<()> {
        match self {
            Maintenance::Compact => store.compact(),
            Maintenance::Finalize => store.finalize(),
        }
    }

    fn labels(self, labels: &mut LabelMap) -> StorageResult<()> {
        match self {
            Maintenance::Compact => labels.compact(),
            Maintenance::Finalize => labels.finalize(),
        }
    }
}

/// Searchable index of a directed labeled graph with optionally attached data.
///
/// Labels are used for nodes and edges, so the graph consists of
/// `(subject, predicate, object)` label triples, see [`Index::add_triple`].
/// Literal values hang off nodes, see [`Index::add_datum`].
///
/// A new index is empty and must be [`reset`](Index::reset) before use.
/// Once filled it has to be [`finalize`](Index::finalize)d; afterwards it
/// is read-only and any number of queries may run concurrently.
#[derive(Default)]
pub struct Index {
    labels: LabelMap,
    stores: Option<Stores>,

    predicate_mask: Option<FxHashSet<Id>>,
    data_mask: Option<FxHashSet<Id>>,

    stats: IndexStats,
    finalized: bool,

    /// Last triple id handed out
    triple: Id,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties this index and opens fresh stores from `engine`.
    ///
    /// Any previously opened stores are closed first.
    pub fn reset(&mut self, engine: &dyn Engine) -> IndexResult<()> {
        if self.stores.is_some() {
            warn!("Resetting an index that still holds {} triples", self.triple.as_u64());
        }
        self.close()?;

        self.labels.reset(engine).context("failed to reset labels")?;
        let stores = match Stores::open(engine) {
            Ok(stores) => stores,
            Err(err) => {
                return match self.labels.close().context("failed to close labels") {
                    Ok(()) => Err(err),
                    Err(close) => Err(IndexError::Joined(vec![err, close])),
                };
            }
        };

        self.stores = Some(stores);
        self.predicate_mask = None;
        self.data_mask = None;
        self.stats = IndexStats::default();
        self.finalized = false;
        self.triple.reset();

        debug!("Index reset");
        Ok(())
    }

    fn stores(&self) -> IndexResult<&Stores> {
        self.stores.as_ref().ok_or(IndexError::NotInitialized)
    }

    fn writable(&mut self) -> IndexResult<&mut Stores> {
        if self.finalized {
            return Err(IndexError::Finalized);
        }
        self.stores.as_mut().ok_or(IndexError::NotInitialized)
    }

    pub(crate) fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub(crate) fn pso(&self) -> IndexResult<&dyn TernaryStore> {
        Ok(self.stores()?.pso.as_ref())
    }

    pub(crate) fn pos(&self) -> IndexResult<&dyn TernaryStore> {
        Ok(self.stores()?.pos.as_ref())
    }

    /// Running statistics of this index
    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Number of stored triple records, including inferred ones
    pub fn triple_count(&self) -> IndexResult<u64> {
        self.stores()?.triples.count().context("failed to count triples")
    }

    /// Restricts [`Index::add_triple`] to the given predicates
    pub fn set_predicate_mask(&mut self, predicates: &[Label]) -> IndexResult<()> {
        self.predicate_mask = Some(self.mask(predicates)?);
        Ok(())
    }

    /// Restricts [`Index::add_datum`] to the given predicates
    pub fn set_data_mask(&mut self, predicates: &[Label]) -> IndexResult<()> {
        self.data_mask = Some(self.mask(predicates)?);
        Ok(())
    }

    fn mask(&mut self, predicates: &[Label]) -> IndexResult<FxHashSet<Id>> {
        self.writable()?;
        let mut mask = FxHashSet::default();
        for predicate in predicates {
            let ids = self.labels.add(predicate).context("failed to add predicate label")?;
            mask.insert(ids.canonical);
        }
        Ok(mask)
    }

    /// Resolves a predicate, returning `None` if the active mask excludes it.
    ///
    /// With a mask installed, unknown predicates are not added to the label map.
    fn unmasked(&mut self, predicate: &Label, data: bool) -> IndexResult<Option<LabelIds>> {
        let mask = if data { &self.data_mask } else { &self.predicate_mask };
        let Some(mask) = mask else {
            return Ok(Some(self.labels.add(predicate).context("failed to add predicate label")?));
        };

        let ids = self.labels.get(predicate).context("failed to resolve predicate label")?;
        Ok(ids.filter(|ids| mask.contains(&ids.canonical) || mask.contains(&ids.literal)))
    }

    /// Reserves room for `data` calls to [`Index::add_datum`].
    ///
    /// Only effective before data is added, and only for some backends.
    pub fn grow(&mut self, data: u64) -> IndexResult<()> {
        self.writable()?.data.grow(data).context("failed to grow data")
    }

    /// Inserts a `(subject, predicate, object)` triple.
    ///
    /// Adding a triple more than once does not create a new edge. If
    /// `predicate` has a declared inverse, the inverse triple is inserted as well.
    pub fn add_triple(&mut self, subject: &Label, predicate: &Label, object: &Label) -> IndexResult<()> {
        self.writable()?;

        let Some(p) = self.unmasked(predicate, false)? else {
            self.stats.masked_pred_triples += 1;
            return Ok(());
        };

        let s = self.labels.add(subject).context("failed to add subject label")?;
        let o = self.labels.add(object).context("failed to add object label")?;

        let id = self.triple.inc()?;
        self.store_triple(id, Role::Regular, [s, p, o])?;
        if !self.insert(s.canonical, p.canonical, o.canonical, id)? {
            self.stats.direct_triples += 1;
        }

        let inverse = self.writable()?.inverses.get(&p.canonical).context("failed to get inverse")?;
        if let Some(i) = inverse {
            let iid = self.triple.inc()?;
            let items = [
                LabelIds {
                    canonical: o.canonical,
                    literal: s.literal,
                },
                LabelIds {
                    canonical: i,
                    literal: p.literal,
                },
                LabelIds {
                    canonical: s.canonical,
                    literal: o.literal,
                },
            ];
            self.store_triple(iid, Role::Inverse, items)?;
            if !self.insert(o.canonical, i, s.canonical, iid)? {
                self.stats.inverse_triples += 1;
            }
        }
        Ok(())
    }

    /// Attaches the literal `value` to `subject` via `predicate`
    pub fn add_data(&mut self, subject: &Label, predicate: &Label, value: &str) -> IndexResult<()> {
        self.add_datum(subject, predicate, &Datum::new(value))
    }

    /// Like [`Index::add_data`], with a language tag
    pub fn add_lang_data(&mut self, subject: &Label, predicate: &Label, value: &str, language: &str) -> IndexResult<()> {
        self.add_datum(subject, predicate, &Datum::with_language(value, language))
    }

    /// Attaches `datum` to `subject` via `predicate`.
    ///
    /// Every call creates a new datum; a subject may carry several data
    /// under the same predicate.
    pub fn add_datum(&mut self, subject: &Label, predicate: &Label, datum: &Datum) -> IndexResult<()> {
        self.writable()?;

        let Some(p) = self.unmasked(predicate, true)? else {
            self.stats.masked_data_triples += 1;
            return Ok(());
        };

        let o = self.labels.next().context("failed to allocate datum id")?;
        let stores = self.writable()?;
        stores.data.set(o, datum.value.clone()).context("failed to add object data")?;
        if let Some(language) = &datum.language {
            stores
                .languages
                .set(o, language.clone())
                .context("failed to add object language")?;
        }

        let s = self.labels.add(subject).context("failed to add subject label")?;

        let id = self.triple.inc()?;
        self.store_triple(id, Role::Data, [s, p, LabelIds::fresh(o)])?;
        if !self.insert(s.canonical, p.canonical, o, id)? {
            self.stats.datum_triples += 1;
        }
        Ok(())
    }

    fn store_triple(&mut self, id: Id, role: Role, items: [LabelIds; 3]) -> IndexResult<()> {
        self.writable()?
            .triples
            .set(id, StoredTriple { role, items })
            .context("failed to add triple to index")
    }

    /// Inserts `(subject, predicate, object)` into both directions of the index.
    ///
    /// Returns whether the insert collided with an existing triple.
    fn insert(&mut self, subject: Id, predicate: Id, object: Id, label: Id) -> IndexResult<bool> {
        let Stores { triples, pso, pos, .. } = self.stores.as_mut().ok_or(IndexError::NotInitialized)?;

        let triples: &dyn KeyValueStore<Id, StoredTriple> = triples.as_ref();
        let mut resolve = |old: Id, conflicting: Id| resolve_conflict(triples, old, conflicting);

        let forward = pso
            .add(predicate, subject, object, label, &mut resolve)
            .context("failed to add to pso index")?;
        let backward = pos
            .add(predicate, object, subject, label, &mut resolve)
            .context("failed to add to pos index")?;

        let conflicted = forward || backward;
        if conflicted {
            self.stats.conflict_triples += 1;
        }
        Ok(conflicted)
    }

    /// Identifies `old` with `same`, see [`LabelMap::mark_identical`]
    pub fn mark_identical(&mut self, same: &Label, old: &Label) -> IndexResult<Id> {
        self.writable()?;
        self.labels.mark_identical(same, old).context("failed to set identical")
    }

    /// Declares `left` and `right` as inverse properties of each other.
    ///
    /// Every later `add_triple(s, left, o)` also inserts `(o, right, s)` and
    /// vice versa. Each label has at most one inverse; declaring a label its
    /// own inverse is a no-op.
    pub fn mark_inverse(&mut self, left: &Label, right: &Label) -> IndexResult<()> {
        self.writable()?;

        let l = self.labels.add(left).context("failed to add left label")?;
        let r = self.labels.add(right).context("failed to add right label")?;
        if l.canonical == r.canonical {
            return Ok(());
        }

        let inverses = &mut self.writable()?.inverses;
        inverses
            .set(l.canonical, r.canonical)
            .context("failed to set left-right inverse")?;
        inverses
            .set(r.canonical, l.canonical)
            .context("failed to set right-left inverse")
    }

    /// Writes every label with a distinct canonical label into `sink`,
    /// see [`LabelMap::identity_map`]
    pub fn identity_map(&self, sink: &mut dyn KeyValueStore<Label, Label>) -> IndexResult<()> {
        self.stores()?;
        self.labels.identity_map(sink).context("failed to get identity map")
    }

    /// Datum with id `id`, if any
    pub(crate) fn datum(&self, id: Id) -> IndexResult<Option<Datum>> {
        let stores = self.stores()?;
        let Some(value) = stores.data.get(&id).context("failed to resolve datum")? else {
            return Ok(None);
        };
        let language = stores.languages.get(&id).context("failed to resolve language")?;
        Ok(Some(Datum { value, language }))
    }

    /// Resolves the triple with id `id`
    pub fn triple(&self, id: Id) -> IndexResult<Triple> {
        let stored = self
            .stores()?
            .triples
            .get(&id)
            .context("failed to resolve triple")?
            .ok_or(IndexError::TripleNotFound(id))?;

        let reverse = |id: Id| self.labels.reverse(id).context("failed to reverse label");
        let [s, p, o] = stored.items;

        let datum = match stored.role {
            Role::Data => self.datum(o.literal)?,
            _ => None,
        };

        Ok(Triple {
            subject: reverse(s.literal)?,
            predicate: reverse(p.literal)?,
            object: reverse(o.literal)?,
            canonical_subject: reverse(s.canonical)?,
            canonical_predicate: reverse(p.canonical)?,
            canonical_object: reverse(o.canonical)?,
            datum,
            id,
            role: stored.role,
        })
    }

    fn maintain(&mut self, op: Maintenance) -> IndexResult<()> {
        let Index { labels, stores, .. } = self;
        let Stores {
            data,
            languages,
            inverses,
            triples,
            pso,
            pos,
        } = stores.as_mut().ok_or(IndexError::NotInitialized)?;

        let tasks: Vec<Task<'_, IndexError>> = vec![
            Box::new(move || op.labels(labels).context(op.context("labels"))) as Task<'_, IndexError>,
            Box::new(move || {
                let data = op.store(data.as_mut()).context(op.context("data"));
                let languages = op.store(languages.as_mut()).context(op.context("languages"));
                data.and(languages)
            }),
            Box::new(move || op.store(inverses.as_mut()).context(op.context("inverses"))),
            Box::new(move || op.ternary(pso.as_mut()).context(op.context("pso index"))),
            Box::new(move || op.ternary(pos.as_mut()).context(op.context("pos index"))),
            Box::new(move || op.store(triples.as_mut()).context(op.context("triples"))),
        ];
        IndexError::join(fan_out(tasks))
    }

    /// Performs internal optimizations of all stores
    pub fn compact(&mut self) -> IndexResult<()> {
        self.writable()?;
        debug!("Compacting index {}", self.stats);
        self.maintain(Maintenance::Compact)
    }

    /// Switches this index to read-only.
    ///
    /// Must be called after all `add_*` and `mark_*` calls and before
    /// querying. Calling it twice fails with [`IndexError::Finalized`].
    pub fn finalize(&mut self) -> IndexResult<()> {
        self.writable()?;
        self.finalized = true;
        self.maintain(Maintenance::Finalize)?;
        info!("Index finalized {}", self.stats);
        Ok(())
    }

    /// Closes all stores. Closing more than once is a no-op.
    pub fn close(&mut self) -> IndexResult<()> {
        let mut errors = Vec::new();
        if let Err(err) = self.labels.close() {
            errors.push(IndexError::Storage {
                context: "failed to close labels".to_string(),
                source: err,
            });
        }
        if let Some(mut stores) = self.stores.take() {
            errors.extend(stores.close());
        }
        IndexError::join(errors)
    }
}

/// Picks the surviving triple when two triples land on the same edge.
///
/// The triple with the smaller [`Role`] wins, so asserted triples beat inferred ones.
fn resolve_conflict(triples: &dyn KeyValueStore<Id, StoredTriple>, old: Id, conflicting: Id) -> StorageResult<Id> {
    let old_triple = triples.get(&old)?.ok_or(StorageError::CorruptedReference(old))?;
    let new_triple = triples
        .get(&conflicting)?
        .ok_or(StorageError::CorruptedReference(conflicting))?;

    if new_triple.role < old_triple.role {
        Ok(conflicting)
    } else {
        Ok(old)
    }
}

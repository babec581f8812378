use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tempfile::TempDir;
use triplex::{
    Datum, DiskEngine, Engine, Id, Index, IndexError, KeyValueStore, Label, MemoryEngine, MemoryStore, Role, Triple,
};

fn l(i: i64) -> Label {
    Label::new(i.to_string())
}

fn d(i: i64) -> Datum {
    Datum::new(i.to_string())
}

fn s(label: &str) -> Label {
    Label::new(label)
}

fn triple(role: Role, literal: [Label; 3], canonical: [Label; 3], datum: Option<Datum>) -> Triple {
    let [subject, predicate, object] = literal;
    let [canonical_subject, canonical_predicate, canonical_object] = canonical;
    Triple {
        subject,
        predicate,
        object,
        canonical_subject,
        canonical_predicate,
        canonical_object,
        datum,
        id: Id::ZERO,
        role,
    }
}

fn regular(subject: i64, predicate: i64, object: i64) -> Triple {
    triple(
        Role::Regular,
        [l(subject), l(predicate), l(object)],
        [l(subject), l(predicate), l(object)],
        None,
    )
}

/// Builds a graph with `n` chains `3i+6 -0-> 3i+7 -1-> 3i+8 -3-> i`.
///
/// Edges are added either directly or through their inverse, and every
/// other `3i+8` has an identical alias `-(3i+8)`.
fn build_graph(engine: &dyn Engine, n: i64) -> Index {
    let mut index = Index::new();
    index.reset(engine).unwrap();

    index.mark_inverse(&l(0), &l(-1)).unwrap();
    index.mark_inverse(&l(1), &l(-2)).unwrap();

    for i in (0..n).step_by(2) {
        index.mark_identical(&l(3 * i + 8), &l(-(3 * i + 8))).unwrap();
    }

    for i in 0..n {
        if i % 4 == 0 || i % 4 == 1 {
            index.add_triple(&l(3 * i + 6), &l(0), &l(3 * i + 7)).unwrap();
        } else {
            index.add_triple(&l(3 * i + 7), &l(-1), &l(3 * i + 6)).unwrap();
        }

        if i % 4 == 0 || i % 4 == 2 {
            index.add_triple(&l(3 * i + 7), &l(1), &l(3 * i + 8)).unwrap();
        } else {
            index.add_triple(&l(3 * i + 8), &l(-2), &l(3 * i + 7)).unwrap();
        }

        index.add_triple(&l(3 * i + 6), &l(2), &l(2)).unwrap();
        index.add_triple(&l(3 * i + 7), &l(3), &l(3)).unwrap();

        if i % 4 == 0 {
            index.add_datum(&l(-(3 * i + 8)), &l(3), &d(i)).unwrap();
        } else {
            index.add_datum(&l(3 * i + 8), &l(3), &d(i)).unwrap();
        }
    }

    // unrelated noise
    let mut rng = StdRng::seed_from_u64(n as u64);
    for _ in 0..100 {
        index
            .add_triple(&l(rng.gen_range(0..n)), &l(4), &l(rng.gen_range(0..n)))
            .unwrap();
        index
            .add_triple(&l(rng.gen_range(0..n)), &l(5), &l(rng.gen_range(0..n)))
            .unwrap();
    }

    index.finalize().unwrap();
    index
}

fn expected_triples(i: i64) -> Vec<Triple> {
    let mut want = vec![regular(3 * i + 6, 2, 2), regular(3 * i + 7, 3, 3)];

    if i % 4 == 0 || i % 4 == 1 {
        want.push(regular(3 * i + 6, 0, 3 * i + 7));
    } else {
        want.push(triple(
            Role::Inverse,
            [l(3 * i + 7), l(-1), l(3 * i + 6)],
            [l(3 * i + 6), l(0), l(3 * i + 7)],
            None,
        ));
    }

    if i % 4 == 0 || i % 4 == 2 {
        want.push(regular(3 * i + 7, 1, 3 * i + 8));
    } else {
        want.push(triple(
            Role::Inverse,
            [l(3 * i + 8), l(-2), l(3 * i + 7)],
            [l(3 * i + 7), l(1), l(3 * i + 8)],
            None,
        ));
    }

    let subject = if i % 4 == 0 { l(-(3 * i + 8)) } else { l(3 * i + 8) };
    want.push(triple(
        Role::Data,
        [subject, l(3), Label::default()],
        [l(3 * i + 8), l(3), Label::default()],
        Some(d(i)),
    ));
    want
}

fn check_graph(index: &Index, n: i64) {
    let mut query = index.paths_starting(&l(2), &l(2)).unwrap();
    query
        .connected(&l(0))
        .unwrap()
        .ending(&l(3), &l(3))
        .unwrap()
        .connected(&l(1))
        .unwrap()
        .connected(&l(3))
        .unwrap();

    let mut encountered = HashSet::new();
    for path in query.paths() {
        let path = path.unwrap();
        let datum = path.datum.clone().expect("path without datum");
        let i: i64 = datum.value.parse().unwrap();
        assert!(encountered.insert(i), "path {} returned twice", i);

        assert_eq!(path.nodes, vec![l(3 * i + 6), l(3 * i + 7), l(3 * i + 8)]);
        assert_eq!(path.edges, vec![l(0), l(1), l(3)]);

        let mut triples = path.triples;
        for triple in &mut triples {
            triple.id.reset();
        }
        assert_eq!(triples, expected_triples(i), "triples of path {}", i);
    }

    assert_eq!(encountered.len() as i64, n);
    assert!((0..n).all(|i| encountered.contains(&i)));
}

#[test]
fn test_memory_engine() {
    let mut index = build_graph(&MemoryEngine, 100_000);
    check_graph(&index, 100_000);
    index.close().unwrap();
}

#[test]
fn test_disk_engine() {
    let temp_dir = TempDir::new().unwrap();
    let mut index = build_graph(&DiskEngine::new(temp_dir.path()), 10_000);
    check_graph(&index, 10_000);
    index.close().unwrap();
}

#[test]
fn test_concurrent_queries() {
    let index = build_graph(&MemoryEngine, 1_000);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut query = index.paths_starting(&l(2), &l(2)).unwrap();
                    query.connected(&l(0)).unwrap().connected(&l(1)).unwrap();
                    query.paths().filter(Result::is_ok).count()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1_000);
        }
    });
}

#[test]
fn test_size_before_iteration() {
    let index = build_graph(&MemoryEngine, 100);

    let mut query = index.paths_starting(&l(2), &l(2)).unwrap();
    query.connected(&l(0)).unwrap();
    assert_eq!(query.size().unwrap(), 100);

    let paths: Vec<_> = query.paths().collect::<Result<_, _>>().unwrap();
    assert_eq!(paths.len(), 100);
}

#[test]
fn test_finalize_discipline() {
    let mut index = Index::new();
    index.reset(&MemoryEngine).unwrap();
    index.add_triple(&s("a"), &s("p"), &s("b")).unwrap();
    index.finalize().unwrap();

    let stats = index.stats();
    let count = index.triple_count().unwrap();

    assert!(matches!(index.add_triple(&s("a"), &s("p"), &s("c")), Err(IndexError::Finalized)));
    assert!(matches!(index.add_data(&s("a"), &s("q"), "x"), Err(IndexError::Finalized)));
    assert!(matches!(index.add_lang_data(&s("a"), &s("q"), "x", "en"), Err(IndexError::Finalized)));
    assert!(matches!(index.add_datum(&s("a"), &s("q"), &Datum::new("x")), Err(IndexError::Finalized)));
    assert!(matches!(index.mark_identical(&s("a"), &s("c")), Err(IndexError::Finalized)));
    assert!(matches!(index.mark_inverse(&s("p"), &s("q")), Err(IndexError::Finalized)));
    assert!(matches!(index.set_predicate_mask(&[s("p")]), Err(IndexError::Finalized)));
    assert!(matches!(index.set_data_mask(&[s("q")]), Err(IndexError::Finalized)));
    assert!(matches!(index.grow(10), Err(IndexError::Finalized)));
    assert!(matches!(index.compact(), Err(IndexError::Finalized)));
    assert!(matches!(index.finalize(), Err(IndexError::Finalized)));

    // nothing above touched the index
    assert_eq!(index.stats(), stats);
    assert_eq!(index.triple_count().unwrap(), count);
    assert_eq!(index.paths_starting(&s("p"), &s("c")).unwrap().size().unwrap(), 0);
    assert_eq!(index.paths_starting(&s("q"), &s("a")).unwrap().size().unwrap(), 0);
    assert_eq!(index.paths_starting(&s("p"), &s("b")).unwrap().size().unwrap(), 1);

    index.close().unwrap();
    index.close().unwrap();
    assert!(index.paths_starting(&s("p"), &s("b")).is_err());
    assert!(matches!(index.triple_count(), Err(IndexError::NotInitialized)));
}

#[test]
fn test_asserted_beats_inferred_after_merge() {
    let mut index = Index::new();
    index.reset(&MemoryEngine).unwrap();
    index.mark_inverse(&s("p"), &s("q")).unwrap();
    index.mark_identical(&s("a"), &s("a2")).unwrap();

    // (a p b) is first inferred, then asserted through the alias a2
    index.add_triple(&s("b"), &s("q"), &s("a")).unwrap();
    index.add_triple(&s("a2"), &s("p"), &s("b")).unwrap();
    index.finalize().unwrap();

    let stats = index.stats();
    assert_eq!(stats.direct_triples, 1);
    assert_eq!(stats.inverse_triples, 1);
    assert_eq!(stats.conflict_triples, 2);

    let paths: Vec<_> = index
        .paths_starting(&s("p"), &s("b"))
        .unwrap()
        .paths()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].nodes, vec![s("a")]);

    let edge = &paths[0].triples[0];
    assert_eq!(edge.role, Role::Regular);
    assert_eq!(edge.subject, s("a2"));
    assert_eq!(edge.canonical_subject, s("a"));
    assert!(!edge.inferred());

    let paths: Vec<_> = index
        .paths_starting(&s("q"), &s("a"))
        .unwrap()
        .paths()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].triples[0].role, Role::Regular);
    assert_eq!(paths[0].triples[0].subject, s("b"));
}

#[test]
fn test_masks() {
    let mut index = Index::new();
    index.reset(&MemoryEngine).unwrap();
    index.set_predicate_mask(&[s("p")]).unwrap();
    index.set_data_mask(&[s("name")]).unwrap();

    index.add_triple(&s("a"), &s("p"), &s("b")).unwrap();
    index.add_triple(&s("a"), &s("r"), &s("b")).unwrap();
    index.add_data(&s("a"), &s("name"), "A").unwrap();
    index.add_data(&s("a"), &s("comment"), "ignored").unwrap();
    index.finalize().unwrap();

    let stats = index.stats();
    assert_eq!(stats.direct_triples, 1);
    assert_eq!(stats.masked_pred_triples, 1);
    assert_eq!(stats.datum_triples, 1);
    assert_eq!(stats.masked_data_triples, 1);
    assert_eq!(index.triple_count().unwrap(), 2);

    assert_eq!(index.paths_starting(&s("r"), &s("b")).unwrap().size().unwrap(), 0);
    assert_eq!(index.paths_starting(&s("p"), &s("b")).unwrap().size().unwrap(), 1);

    // expanding from a subject goes through pso
    let mut forward = index.paths_starting(&s("p"), &s("b")).unwrap();
    forward.connected(&s("r")).unwrap();
    assert_eq!(forward.size().unwrap(), 0);

    let mut kept = index.paths_starting(&s("p"), &s("b")).unwrap();
    kept.connected(&s("p")).unwrap();
    assert_eq!(kept.size().unwrap(), 1);
}

#[test]
fn test_identity_map() {
    let index = build_graph(&MemoryEngine, 10);

    let mut identities = MemoryStore::<Label, Label>::new();
    index.identity_map(&mut identities).unwrap();

    let mut pairs = Vec::new();
    identities
        .iterate(&mut |alias, canonical| {
            pairs.push((alias, canonical));
            Ok(())
        })
        .unwrap();
    pairs.sort();

    let mut want: Vec<_> = (0..10).step_by(2).map(|i| (l(-(3 * i + 8)), l(3 * i + 8))).collect();
    want.sort();
    assert_eq!(pairs, want);
}

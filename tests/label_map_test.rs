use tempfile::TempDir;
use triplex::{DiskEngine, Id, Label, LabelEngine, LabelMap, MemoryEngine, StorageError};

fn l(s: &str) -> Label {
    Label::new(s)
}

fn open(engine: &dyn LabelEngine) -> LabelMap {
    let mut map = LabelMap::new();
    map.reset(engine).unwrap();
    map
}

fn check_identity_chain(map: &mut LabelMap) {
    let a = map.add(&l("a")).unwrap();
    let b = map.add(&l("b")).unwrap();
    map.add(&l("unrelated")).unwrap();

    // a joins b, then both join c
    assert_eq!(map.mark_identical(&l("b"), &l("a")).unwrap(), b.canonical);
    let c = map.mark_identical(&l("c"), &l("b")).unwrap();

    for label in ["a", "b", "c"] {
        assert_eq!(map.forward(&l(label)).unwrap(), c, "canonical of {}", label);
    }
    assert_ne!(map.forward(&l("unrelated")).unwrap(), c);

    // literal ids are never rewritten
    assert_eq!(map.get(&l("a")).unwrap().unwrap().literal, a.literal);
    assert_eq!(map.reverse(a.literal).unwrap(), l("a"));
    assert_eq!(map.reverse(c).unwrap(), l("c"));

    // marking again is a no-op
    assert_eq!(map.mark_identical(&l("c"), &l("a")).unwrap(), c);
}

#[test]
fn test_identity_chain_memory() {
    let mut map = open(&MemoryEngine);
    check_identity_chain(&mut map);
    map.close().unwrap();
}

#[test]
fn test_identity_chain_disk() {
    let temp_dir = TempDir::new().unwrap();
    let mut map = open(&DiskEngine::new(temp_dir.path()));
    check_identity_chain(&mut map);
    map.close().unwrap();
}

#[test]
fn test_finalized_disk_map_reads() {
    let temp_dir = TempDir::new().unwrap();
    let mut map = open(&DiskEngine::new(temp_dir.path()));

    let ids: Vec<_> = (0..1_000).map(|i| map.add(&Label::new(format!("label{}", i))).unwrap()).collect();
    map.compact().unwrap();
    map.finalize().unwrap();

    for (i, ids) in ids.iter().enumerate() {
        let label = Label::new(format!("label{}", i));
        assert_eq!(map.forward(&label).unwrap(), ids.canonical);
        assert_eq!(map.reverse(ids.literal).unwrap(), label);
    }
    assert_eq!(map.forward(&l("missing")).unwrap(), Id::ZERO);
    assert!(matches!(map.add(&l("late")), Err(StorageError::Finalized)));
    assert!(matches!(map.finalize(), Err(StorageError::Finalized)));

    map.close().unwrap();
    assert!(matches!(map.forward(&l("label0")), Err(StorageError::Closed)));
}

#[test]
fn test_reset_discards_labels() {
    let temp_dir = TempDir::new().unwrap();
    let engine = DiskEngine::new(temp_dir.path());

    let mut map = open(&engine);
    let first = map.add(&l("a")).unwrap();
    map.close().unwrap();

    map.reset(&engine).unwrap();
    assert!(map.get(&l("a")).unwrap().is_none());
    assert_eq!(map.add(&l("b")).unwrap(), first);
    map.close().unwrap();
}

use anyhow::Context;
use triplex::{load_index, Datum, IndexConfig, Label, NQuadsSource, Statement, VecSource};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Triplex v{}", triplex::version());
    println!("==========================================");
    println!();

    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(path) => {
            let config = match args.next() {
                Some(config) => IndexConfig::from_yaml_file(&config)?,
                None => IndexConfig::default(),
            };
            demo_load_file(&path, &config)
        }
        None => demo_people(),
    }
}

fn demo_people() -> anyhow::Result<()> {
    println!("=== Demo: People ===");

    let same_as = "http://www.w3.org/2002/07/owl#sameAs";
    let inverse_of = "http://www.w3.org/2002/07/owl#inverseOf";
    let mut source = VecSource::new(vec![
        Statement::link("alice", "type", "person"),
        Statement::link("bob", "type", "person"),
        Statement::link("alice", "knows", "bob"),
        Statement::link("carol", "knownBy", "bob"),
        Statement::link("knows", inverse_of, "knownBy"),
        Statement::link("bob", same_as, "robert"),
        Statement::data("robert", "name", Datum::new("Bob")),
        Statement::data("carol", "name", Datum::with_language("Carole", "fr")),
    ]);

    let index = load_index(&mut source, &IndexConfig::default()).context("failed to build index")?;
    println!("✓ Loaded {} triples: {}", index.triple_count()?, index.stats());
    println!();

    println!("People and the names of everyone they know:");
    let l = |s: &str| Label::new(s);
    let mut paths = index.paths_starting(&l("type"), &l("person"))?;
    paths.connected(&l("knows"))?.connected(&l("name"))?;
    for path in paths.paths() {
        let path = path?;
        println!("  {}", path);
        for triple in &path.triples {
            let marker = if triple.inferred() { " (inferred)" } else { "" };
            println!(
                "    {} {} {}{}",
                triple.canonical_subject, triple.canonical_predicate, triple.canonical_object, marker
            );
        }
    }

    Ok(())
}

fn demo_load_file(path: &str, config: &IndexConfig) -> anyhow::Result<()> {
    println!("=== Loading {} ===", path);

    let mut source = NQuadsSource::open(path);
    let index = load_index(&mut source, config).with_context(|| format!("failed to load {}", path))?;

    println!("✓ Loaded {} triples", index.triple_count()?);
    println!("  {}", index.stats());
    Ok(())
}

mod common;

use stdprop::diagnostics::StoreError;
use stdprop::generator::{IntRange, Trace, int_range};
use stdprop::harness::{Origin, PropertyState};
use stdprop::oracle::ViolationKind;
use stdprop::store::FailureStore;
use stdprop::{Harness, HarnessConfig, Oracle, Property};

use common::quick_config;

const ID: &str = "demo.below_thousand";

fn below_thousand(limit: i64) -> Property<IntRange> {
    Property::new(
        ID,
        "values stay below the limit",
        int_range(0, 1_000_000),
        Oracle::differential("bounded", move |x: &i64| Ok(*x < limit), "claim", |_: &i64| Ok(true)),
    )
}

fn with_db(dir: &std::path::Path, seed: u64) -> HarnessConfig {
    HarnessConfig { database: Some(dir.to_path_buf()), seed: Some(seed), ..quick_config(200) }
}

#[test]
fn minimized_failure_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let report = Harness::new(with_db(dir.path(), 1)).run_property(&below_thousand(1000));
    let failure = report.state.primary_failure().expect("failed");
    assert_eq!(failure.minimized.input, "1000");

    let store = FailureStore::open(dir.path()).unwrap();
    let stored = store.load(ID).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].trace, Trace::new(vec![1000]));
    assert_eq!(stored[0].input, "1000");
    assert_eq!(stored[0].kind, ViolationKind::Disagreement);
}

#[test]
fn stored_failure_is_replayed_before_exploring() {
    let dir = tempfile::tempdir().unwrap();
    Harness::new(with_db(dir.path(), 1)).run_property(&below_thousand(1000));

    let report = Harness::new(with_db(dir.path(), 2)).run_property(&below_thousand(1000));
    assert_eq!(report.replayed, 1);
    assert_eq!(report.examples, 0);
    let failure = report.state.primary_failure().expect("stored failure still fails");
    assert_eq!(failure.origin, Origin::Stored);
    assert_eq!(failure.minimized.input, "1000");
}

#[test]
fn fixed_property_passes_and_keeps_its_entry() {
    let dir = tempfile::tempdir().unwrap();
    Harness::new(with_db(dir.path(), 1)).run_property(&below_thousand(1000));

    let report = Harness::new(with_db(dir.path(), 3)).run_property(&below_thousand(i64::MAX));
    assert_eq!(report.replayed, 1);
    assert!(matches!(report.state, PropertyState::Passed { .. }), "{:?}", report.state);
    let store = FailureStore::open(dir.path()).unwrap();
    assert_eq!(store.load(ID).unwrap().len(), 1);
}

#[test]
fn corrupt_file_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = FailureStore::open(dir.path()).unwrap();
    std::fs::write(store.path_for(ID), b"garbage!garbage!").unwrap();
    assert!(matches!(store.load(ID), Err(StoreError::InvalidMagic)));

    let report = Harness::new(with_db(dir.path(), 4)).run_property(&below_thousand(i64::MAX));
    assert_eq!(report.replayed, 0);
    assert!(matches!(report.state, PropertyState::Passed { .. }), "{:?}", report.state);
}

#[test]
fn list_remove_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new(with_db(dir.path(), 1));
    harness.run_property(&below_thousand(1000));
    let other = Property::new(
        "demo.even",
        "",
        int_range(0, 100),
        Oracle::differential("parity", |x: &i64| Ok(x % 2), "claim", |_: &i64| Ok(0)),
    );
    assert!(harness.run_property(&other).state.primary_failure().is_some());

    let store = FailureStore::open(dir.path()).unwrap();
    let entries = store.list().unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.property.as_str()).collect();
    assert_eq!(ids, ["demo.below_thousand", "demo.even"]);
    let odd: i64 = entries[1].failures[0].input.parse().unwrap();
    assert_eq!(odd % 2, 1);

    assert!(store.remove_property("demo.even").unwrap());
    assert!(!store.remove_property("demo.even").unwrap());
    assert_eq!(store.list().unwrap().len(), 1);
    assert_eq!(store.clear().unwrap(), 1);
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn unwritable_database_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, b"").unwrap();
    let harness = Harness::new(with_db(&blocker, 1));
    assert!(harness.store().is_none());
    let report = harness.run_property(&below_thousand(1000));
    assert_eq!(report.state.primary_failure().unwrap().minimized.input, "1000");
}

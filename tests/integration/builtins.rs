mod common;

use stdprop::generator::{GenConfig, Trace};
use stdprop::harness::PropertyState;
use stdprop::oracle::Verdict;
use stdprop::{Harness, Registry};

use common::quick_config;

const IDS: &[&str] = &[
    "source.tokenize_round_trip",
    "source.token_stream_stable",
    "source.unparse_round_trip",
    "source.int_literal_value",
    "codec.base64_round_trip",
    "compress.round_trip",
    "compress.chunked_decompress",
    "checksum.crc32_incremental",
    "json.round_trip",
    "json.dumps_stable",
    "marshal.bincode_round_trip",
    "text.normalization_composition",
    "text.find_within_affixes",
    "text.rfind_within_affixes",
    "time.rfc3339_round_trip",
    "time.iso_week_round_trip",
    "time.zone_offset_differential",
    "regex.match_by_construction",
];

#[test]
fn registers_every_property_in_order() {
    let registry = Registry::builtin().unwrap();
    let ids: Vec<_> = registry.properties.iter().map(|p| p.id()).collect();
    assert_eq!(ids, IDS);
    assert!(registry.properties.iter().all(|p| !p.description().is_empty()));
}

#[test]
fn generator_tags_are_listed() {
    let registry = Registry::builtin().unwrap();
    let tags: Vec<_> = registry.generators.tags().map(|(tag, _)| tag).collect();
    for tag in ["source.module", "codec.payload", "json.value", "time.instant", "regex.case"] {
        assert!(tags.contains(&tag), "missing {tag}");
    }
}

#[test]
fn empty_trace_holds_everywhere() {
    let registry = Registry::builtin().unwrap();
    let config = GenConfig::default();
    for property in registry.properties.iter() {
        let outcome = property.check_trace(&Trace::empty(), &config).unwrap();
        assert!(!outcome.verdict.is_violation(), "{}: {:?}", property.id(), outcome.verdict);
    }
}

#[test]
fn replaying_a_recorded_trace_is_deterministic() {
    let registry = Registry::builtin().unwrap();
    let config = GenConfig::default();
    let property = registry.properties.get("time.rfc3339_round_trip").unwrap();
    let trace = Trace::new(vec![1, 2, 40, 9_000, 2, 5, 0, 3, 4]);
    let first = property.check_trace(&trace, &config).unwrap();
    let second = property.check_trace(&first.trace, &config).unwrap();
    assert_eq!(first, second);
    assert!(matches!(first.verdict, Verdict::Hold | Verdict::Reject(_)));
}

#[test]
fn library_backed_properties_pass_a_short_run() {
    let registry = Registry::builtin().unwrap();
    let harness = Harness::new(quick_config(30));
    let selected = registry
        .properties
        .iter()
        .filter(|p| !p.id().starts_with("source."));
    let report = harness.run(selected);
    for p in &report.properties {
        assert!(matches!(p.state, PropertyState::Passed { .. }), "{}: {:?}", p.id, p.state);
    }
    assert!(!report.has_failures());
    assert_eq!(report.seed, 20_240_917);
}

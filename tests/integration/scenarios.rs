//! End-to-end runs of the situations the harness exists for: a lossy
//! reconstitution caught by a round trip, repeat counts that reach both of
//! their bounds, a 32-bit wrap shrunk to the exact boundary instant, and an
//! unconditional failure shrunk to the smallest program the grammar makes.

mod common;

use stdprop::generator::{GenConfig, generate, just};
use stdprop::grammar::{Grammar, Node, python};
use stdprop::harness::PropertyState;
use stdprop::lexer::{self, Lexeme, int_value};
use stdprop::oracle::{Evidence, ViolationKind};
use stdprop::span::Spanned;
use stdprop::targets::time::{instants, transition_zone};
use stdprop::{Harness, HarnessConfig, Oracle, Property, TargetError};

use common::quick_config;

const OCTAL_SOURCE: &str = "x = 0o17\n";

fn tokens(source: &String) -> Result<Vec<Spanned<Lexeme>>, TargetError> {
    lexer::tokenize(source).map_err(TargetError::failed)
}

/// Rewrites every integer literal in decimal, the way a reconstitution that
/// goes through token values instead of token text would.
fn untokenize_by_value(tokens: &Vec<Spanned<Lexeme>>) -> Result<String, TargetError> {
    Ok(tokens
        .iter()
        .map(|t| match int_value(&t.node.text) {
            Some(v) if t.node.kind.is_int() => v.to_string(),
            _ => t.node.text.clone(),
        })
        .collect())
}

#[test]
fn exact_untokenize_round_trips_octal_literal() {
    let property = Property::new(
        "scenario.exact_untokenize",
        "",
        just(OCTAL_SOURCE.to_string()),
        Oracle::round_trip(tokens, |t: &Vec<Spanned<Lexeme>>| Ok(lexer::untokenize(t))),
    );
    let report = Harness::new(quick_config(10)).run_property(&property);
    assert!(
        matches!(report.state, PropertyState::Passed { examples } if examples >= 10),
        "{:?}",
        report.state
    );
}

#[test]
fn lossy_untokenize_fails_with_the_literal_as_evidence() {
    let property = Property::new(
        "scenario.lossy_untokenize",
        "",
        just(OCTAL_SOURCE.to_string()),
        Oracle::round_trip(tokens, untokenize_by_value),
    );
    let report = Harness::new(quick_config(10)).run_property(&property);
    let failure = report.state.primary_failure().expect("lossy untokenize must fail");
    assert_eq!(failure.kind(), ViolationKind::RoundTripMismatch);
    assert_eq!(failure.minimized.input, format!("{OCTAL_SOURCE:?}"));
    match &failure.evidence {
        Evidence::RoundTrip { input, decoded, divergence, .. } => {
            assert!(input.contains("0o17"), "{input}");
            assert_eq!(decoded, &format!("{:?}", "x = 15\n"));
            assert!(divergence.is_some());
        }
        other => panic!("unexpected evidence {other:?}"),
    }
}

#[test]
fn nested_repeat_reaches_both_count_bounds() {
    let grammar = Grammar::builder()
        .rule("groups", Node::repeat(Node::rule("group"), 0, 5))
        .rule("group", Node::seq([Node::t("("), Node::rule("groups"), Node::t(")")]))
        .build()
        .unwrap();
    let config = GenConfig::default();
    let mut seen = [false; 6];
    for seed in 0..1000 {
        let text = generate(&grammar, seed, &config).unwrap().value;
        let mut depth = 0usize;
        let mut top_level = 0usize;
        for c in text.chars() {
            if c == '(' {
                if depth == 0 {
                    top_level += 1;
                }
                depth += 1;
            } else {
                depth -= 1;
            }
        }
        assert_eq!(depth, 0, "{text}");
        assert!(top_level <= 5, "{text}");
        seen[top_level] = true;
    }
    assert!(seen[0], "no empty expansion");
    assert!(seen[5], "no expansion with five groups");
}

#[test]
fn narrow_offset_lookup_shrinks_to_two_to_the_thirty_first() {
    let zone = transition_zone();
    let narrow = zone.clone();
    let property = Property::new(
        "scenario.narrow_offset",
        "",
        instants(&zone),
        Oracle::differential(
            "wide",
            move |t: &i64| Ok(zone.offset_at(*t)),
            "narrow",
            move |t: &i64| Ok(narrow.offset_at(i64::from(*t as i32))),
        ),
    );
    let report = Harness::new(quick_config(1000)).run_property(&property);
    let PropertyState::Failed { failures } = &report.state else {
        panic!("expected a failure, got {:?}", report.state);
    };
    for failure in failures {
        assert_eq!(failure.kind(), ViolationKind::Disagreement);
        assert_eq!(failure.minimized.input, "2147483648");
    }
    match &failures[0].evidence {
        Evidence::Differential { left, right, .. } => {
            assert_eq!(left, "7200");
            assert_eq!(right, "0");
        }
        other => panic!("unexpected evidence {other:?}"),
    }
}

#[test]
fn unconditional_failure_shrinks_to_the_cheapest_program() {
    let grammar = python::grammar().unwrap();
    let cheapest = format!("{:?}", grammar.cheapest());
    let property = Property::new(
        "scenario.always_disagrees",
        "",
        grammar,
        Oracle::differential(
            "text",
            |s: &String| Ok(s.clone()),
            "marked",
            |s: &String| Ok(format!("{s}!")),
        ),
    );
    for seed in 0..10 {
        let config = HarnessConfig { seed: Some(seed), ..quick_config(100) };
        let report = Harness::new(config).run_property(&property);
        let failures = match &report.state {
            PropertyState::Failed { failures } => failures,
            other => panic!("seed {seed}: {other:?}"),
        };
        assert_eq!(failures.len(), 1, "seed {seed}");
        assert_eq!(failures[0].kind(), ViolationKind::Disagreement);
        assert_eq!(failures[0].minimized.input, cheapest, "seed {seed}");
    }
}

// Property-based tests for grammar expansion and trace replay.

use proptest::prelude::*;
use stdprop::generator::{GenConfig, Trace, generate, replay};
use stdprop::grammar::{Grammar, Node, python};
use stdprop::lexer::tokenize;
use stdprop::parser::parse_module;

fn module_grammar() -> Grammar {
    python::grammar().unwrap()
}

#[test]
fn prop_seeded_generation_replays_exactly() {
    let g = module_grammar();
    let config = GenConfig::default();
    proptest!(|(seed in any::<u64>())| {
        let candidate = generate(&g, seed, &config).unwrap();
        prop_assert_eq!(replay(&g, &candidate.trace, &config).unwrap(), candidate);
    });
}

#[test]
fn prop_any_trace_replays_to_a_fixed_point() {
    let g = module_grammar();
    let config = GenConfig::default();
    proptest!(|(draws in prop::collection::vec(any::<u64>(), 0..64))| {
        if let Ok(first) = replay(&g, &Trace::new(draws), &config) {
            let again = replay(&g, &first.trace, &config).unwrap();
            prop_assert_eq!(again, first);
        }
    });
}

#[test]
fn prop_replayed_text_is_valid_source() {
    let g = module_grammar();
    let config = GenConfig::default();
    proptest!(|(draws in prop::collection::vec(0u64..8, 0..48))| {
        if let Ok(candidate) = replay(&g, &Trace::new(draws), &config) {
            let text = candidate.value;
            prop_assert!(tokenize(&text).is_ok(), "{:?}", text);
            prop_assert!(parse_module(&text).is_ok(), "{:?}", text);
        }
    });
}

#[test]
fn prop_budget_bounds_nesting() {
    let g = Grammar::builder()
        .rule(
            "expr",
            Node::any([Node::t("x"), Node::seq([Node::t("("), Node::rule("expr"), Node::t(")")])]),
        )
        .build()
        .unwrap();
    proptest!(|(seed in any::<u64>(), budget in 0usize..40)| {
        let text = generate(&g, seed, &GenConfig::default().with_budget(budget)).unwrap().value;
        let depth = text.chars().filter(|&c| c == '(').count();
        prop_assert!(depth <= budget, "{} levels from budget {}", depth, budget);
        prop_assert!(text.ends_with('x') || text.ends_with(')'));
    });
}

#[test]
fn prop_cheapest_is_the_empty_trace_expansion() {
    proptest!(|(budget in 0usize..200)| {
        let g = module_grammar();
        let config = GenConfig::default().with_budget(budget);
        let candidate = replay(&g, &Trace::empty(), &config).unwrap();
        prop_assert_eq!(candidate.value, g.cheapest());
    });
}

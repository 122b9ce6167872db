// Property-based tests for the trace shrinker.

use proptest::prelude::*;
use stdprop::generator::{GenConfig, Generator, Trace, int_range, replay, vec_of};
use stdprop::shrink::shrink;

const MAX: i64 = 1_000_000;

#[test]
fn prop_threshold_shrinks_to_the_boundary() {
    let g = int_range(0, MAX);
    let config = GenConfig::default();
    proptest!(|(t in 1..=MAX, extra in 0..=MAX)| {
        let v = (t + extra).min(MAX);
        let probe = |candidate: &Trace| {
            let c = replay(&g, candidate, &config).ok()?;
            (c.value >= t).then_some(c.trace)
        };
        let outcome = shrink(Trace::new(vec![v as u64]), 2000, probe);
        prop_assert_eq!(outcome.trace, Trace::new(vec![t as u64]));
    });
}

fn sums() -> impl Generator<Value = Vec<i64>> {
    vec_of(int_range(0, 1000), 0, 20)
}

#[test]
fn prop_result_still_fails_and_never_grows() {
    let g = sums();
    let config = GenConfig::default();
    proptest!(|(draws in prop::collection::vec(0u64..2000, 0..40), k in 1i64..3000)| {
        let fails = |v: &Vec<i64>| v.iter().sum::<i64>() >= k;
        let initial = replay(&g, &Trace::new(draws), &config).unwrap();
        prop_assume!(fails(&initial.value));

        let probe = |candidate: &Trace| {
            let c = replay(&g, candidate, &config).ok()?;
            fails(&c.value).then_some(c.trace)
        };
        let outcome = shrink(initial.trace.clone(), 500, probe);
        prop_assert!(outcome.trace <= initial.trace);
        prop_assert!(outcome.attempts <= 500);
        prop_assert!(outcome.improvements <= outcome.attempts);
        let minimized = replay(&g, &outcome.trace, &config).unwrap();
        prop_assert!(fails(&minimized.value), "{:?}", minimized.value);
    });
}

#[test]
fn prop_always_failing_probe_reaches_the_empty_expansion() {
    let g = sums();
    let config = GenConfig::default();
    proptest!(|(draws in prop::collection::vec(any::<u64>(), 1..30))| {
        let probe = |candidate: &Trace| replay(&g, candidate, &config).ok().map(|c| c.trace);
        let initial = replay(&g, &Trace::new(draws), &config).unwrap().trace;
        let outcome = shrink(initial, 2000, probe);
        let empty = replay(&g, &Trace::empty(), &config).unwrap();
        prop_assert_eq!(outcome.trace, empty.trace);
        prop_assert!(empty.value.is_empty());
    });
}

#[test]
fn prop_attempt_budget_is_respected() {
    let g = int_range(0, MAX);
    let config = GenConfig::default();
    proptest!(|(limit in 0usize..20, v in 1..=MAX)| {
        let probe = |candidate: &Trace| {
            let c = replay(&g, candidate, &config).ok()?;
            (c.value > 0).then_some(c.trace)
        };
        let outcome = shrink(Trace::new(vec![v as u64]), limit, probe);
        prop_assert!(outcome.attempts <= limit);
        prop_assert!(outcome.trace <= Trace::new(vec![v as u64]));
    });
}

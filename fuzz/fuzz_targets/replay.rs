#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stdprop::generator::{GenConfig, Trace, replay};

#[derive(Debug, Arbitrary)]
struct Input {
    draws: Vec<u64>,
    budget: u8,
}

fuzz_target!(|input: Input| {
    // Any trace replays through the module grammar to valid source, and the
    // recorded trace is a fixed point.
    let Ok(g) = stdprop::grammar::python::grammar() else {
        return;
    };
    let config = GenConfig::default().with_budget(usize::from(input.budget));
    if let Ok(first) = replay(&g, &Trace::new(input.draws), &config) {
        assert!(stdprop::parser::parse_module(&first.value).is_ok(), "{:?}", first.value);
        let again = replay(&g, &first.trace, &config).unwrap();
        assert_eq!(again, first);
    }
});

// Property-based tests for the lossless tokenizer.
//
// Run with more cases:
//   PROPTEST_CASES=1000 cargo test --test tokenizer_properties

use proptest::prelude::*;
use stdprop::lexer::{int_value, tokenize, untokenize};

/// Pieces that always lex, including ones that merge with a neighbour
/// (`=` `=` becomes `==`, `1` `.5` becomes a float).
fn piece() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "x", "if", "_a1", "value", "0", "0o17", "0x_FF", "1_000", "1.5", ".5e3", "+", "-", "**",
        "//", "%", "~", "=", "==", "!=", "<=", ">", "(", ")", " ", "\t", "\x0C", "\n", "\r\n",
        "\\\n", "# note\n",
    ])
}

fn source() -> impl Strategy<Value = String> {
    prop::collection::vec(piece(), 0..40).prop_map(|pieces| pieces.concat())
}

#[test]
fn prop_tokenizer_never_panics() {
    proptest!(|(text in "\\PC{0,300}")| {
        let _ = tokenize(&text);
    });
}

#[test]
fn prop_untokenize_is_exact_whenever_tokenize_succeeds() {
    proptest!(|(text in "[ -~\t\n\r]{0,200}")| {
        if let Ok(tokens) = tokenize(&text) {
            prop_assert_eq!(untokenize(&tokens), text);
        }
    });
}

#[test]
fn prop_pieces_always_tokenize_and_round_trip() {
    proptest!(|(text in source())| {
        let tokens = tokenize(&text).map_err(|e| TestCaseError::fail(format!("{e} in {text:?}")))?;
        prop_assert_eq!(untokenize(&tokens), text.clone());
    });
}

#[test]
fn prop_spans_tile_the_input() {
    proptest!(|(text in source())| {
        let tokens = tokenize(&text).unwrap();
        let mut at = 0;
        for t in &tokens {
            prop_assert_eq!(t.span.start, at);
            prop_assert!(t.span.end > t.span.start);
            prop_assert_eq!(&text[t.span.start..t.span.end], t.node.text.as_str());
            at = t.span.end;
        }
        prop_assert_eq!(at, text.len());
    });
}

#[test]
fn prop_decimal_literals_evaluate_to_their_value() {
    proptest!(|(n in any::<u64>())| {
        let text = n.to_string();
        let tokens = tokenize(&text).unwrap();
        prop_assert_eq!(tokens.len(), 1);
        prop_assert!(tokens[0].node.kind.is_int());
        prop_assert_eq!(int_value(&text), Some(u128::from(n)));
    });
}

#[test]
fn prop_radix_literals_agree_with_decimal() {
    proptest!(|(n in any::<u64>())| {
        prop_assert_eq!(int_value(&format!("0x{n:x}")), Some(u128::from(n)));
        prop_assert_eq!(int_value(&format!("0o{n:o}")), Some(u128::from(n)));
        prop_assert_eq!(int_value(&format!("0b{n:b}")), Some(u128::from(n)));
    });
}

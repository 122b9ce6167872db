//! Grammar for a Python-like statement language.
//!
//! Output is always accepted by `lexer::tokenize` and `parser::parse_module`
//! but deliberately leans on the unusual corners: octal/hex/binary literals
//! with underscores, boundary integers, every string escape the tokenizer
//! knows, form feeds and tabs as separators, line continuations inside
//! parentheses, CRLF line ends and trailing comments.

use super::{Grammar, Node};
use crate::diagnostics::GrammarError;

pub const START: &str = "module";
pub const INT_LITERAL: &str = "int_literal";

/// Integer literals around 32/64-bit edges.
const BOUNDARY_INTS: &[&str] = &[
    "0",
    "0o17",
    "0o0",
    "0_0",
    "0b0",
    "0x7fffffff",
    "0x80000000",
    "0xFFFF_FFFF",
    "2147483647",
    "2147483648",
    "4294967295",
    "9223372036854775807",
    "9223372036854775808",
    "18446744073709551616",
];

/// Names include keyword prefixes and suffixes that must not lex as keywords.
const NAMES: &[&str] = &[
    "x", "y", "_", "value", "n_1", "__dunder__", "camelCase", "if_", "None_", "pass1", "orbit",
    "notable", "iffy",
];

fn digits(alphabet: &'static str, max: usize) -> Node {
    let digit = Node::literals(alphabet.split(' '));
    Node::seq([
        digit.clone(),
        Node::repeat(
            Node::choice([(6, digit.clone()), (1, Node::seq([Node::t("_"), digit]))]),
            0,
            max,
        ),
    ])
}

pub fn grammar() -> Result<Grammar, GrammarError> {
    Grammar::builder()
        .rule(START, Node::repeat(Node::rule("line"), 1, 6))
        .rule(
            "line",
            Node::choice([
                (6, Node::seq([Node::rule("simple"), Node::rule("eol")])),
                (2, Node::seq([Node::rule("compound"), Node::rule("eol")])),
                (1, Node::seq([Node::rule("comment"), Node::t("\n")])),
                (1, Node::t("\n")),
            ]),
        )
        .rule(
            "eol",
            Node::choice([
                (8, Node::t("\n")),
                (1, Node::seq([Node::rule("ws"), Node::rule("comment"), Node::t("\n")])),
                (1, Node::t("\r\n")),
            ]),
        )
        .rule(
            "comment",
            Node::seq([
                Node::t("#"),
                Node::repeat(Node::literals(["a", " ", "#", "é", "\\", "\t"]), 0, 10),
            ]),
        )
        .rule(
            "compound",
            Node::seq([
                Node::literals(["if ", "while "]),
                Node::rule("expr"),
                Node::t(":"),
                Node::rule("ws1"),
                Node::rule("simple"),
            ]),
        )
        .rule(
            "simple",
            Node::choice([
                (1, Node::t("pass")),
                (1, Node::seq([
                    Node::t("return"),
                    Node::optional(Node::seq([Node::t(" "), Node::rule("expr")])),
                ])),
                (4, Node::seq([
                    Node::rule("name"),
                    Node::rule("ws"),
                    Node::t("="),
                    Node::rule("ws"),
                    Node::rule("expr"),
                ])),
                (3, Node::rule("expr")),
            ]),
        )
        .rule(
            "expr",
            Node::choice([
                (5, Node::rule("atom")),
                (3, Node::seq([Node::rule("expr"), Node::rule("binop"), Node::rule("expr")])),
                (2, Node::seq([
                    Node::t("("),
                    Node::rule("ws"),
                    Node::rule("expr"),
                    Node::rule("cont"),
                    Node::t(")"),
                ])),
                (1, Node::seq([Node::rule("unop"), Node::rule("expr")])),
                (1, Node::rule("call")),
            ]),
        )
        .rule(
            "binop",
            Node::choice([
                (6, Node::seq([
                    Node::rule("ws"),
                    Node::literals([
                        "+", "-", "*", "/", "//", "%", "**", "==", "!=", "<", "<=", ">", ">=",
                    ]),
                    Node::rule("ws"),
                ])),
                (1, Node::literals([" and ", " or "])),
            ]),
        )
        .rule("unop", Node::literals(["-", "+", "~", "not "]))
        .rule(
            "call",
            Node::seq([
                Node::rule("name"),
                Node::t("("),
                Node::choice([
                    (1, Node::t("")),
                    (2, Node::rule("expr")),
                    (1, Node::seq([
                        Node::rule("expr"),
                        Node::t(","),
                        Node::rule("ws"),
                        Node::rule("expr"),
                    ])),
                ]),
                Node::t(")"),
            ]),
        )
        .rule(
            "cont",
            Node::choice([
                (6, Node::t("")),
                (1, Node::t("\\\n")),
                (1, Node::seq([Node::t(" \\\n"), Node::rule("ws")])),
            ]),
        )
        .rule(
            "atom",
            Node::choice([
                (4, Node::rule("name")),
                (4, Node::rule("number")),
                (2, Node::rule("string")),
                (1, Node::literals(["True", "False", "None"])),
            ]),
        )
        .rule("name", Node::literals(NAMES.iter().copied()))
        .rule("number", Node::choice([(3, Node::rule(INT_LITERAL)), (1, Node::rule("float"))]))
        .rule(
            INT_LITERAL,
            Node::choice([
                (3, Node::rule("decimal")),
                (2, Node::rule("octal")),
                (2, Node::rule("hex")),
                (1, Node::rule("binary")),
                (2, Node::literals(BOUNDARY_INTS.iter().copied())),
            ]),
        )
        .rule(
            "decimal",
            Node::any([
                Node::t("0"),
                Node::seq([Node::literals("1 2 3 4 5 6 7 8 9".split(' ')), Node::rule("dec_tail")]),
            ]),
        )
        .rule(
            "dec_tail",
            Node::repeat(
                Node::choice([
                    (6, Node::literals("0 1 2 3 4 5 6 7 8 9".split(' '))),
                    (1, Node::seq([
                        Node::t("_"),
                        Node::literals("0 1 2 3 4 5 6 7 8 9".split(' ')),
                    ])),
                ]),
                0,
                18,
            ),
        )
        .rule(
            "octal",
            Node::seq([Node::literals(["0o", "0O", "0o_"]), digits("0 1 2 3 4 5 6 7", 19)]),
        )
        .rule(
            "hex",
            Node::seq([
                Node::literals(["0x", "0X", "0x_"]),
                digits("0 1 2 3 4 5 6 7 8 9 a b c d e f A B C D E F", 14),
            ]),
        )
        .rule("binary", Node::seq([Node::literals(["0b", "0B"]), digits("0 1", 31)]))
        .rule(
            "float",
            Node::any([
                Node::seq([
                    Node::rule("float_digits"),
                    Node::t("."),
                    Node::repeat(Node::literals("0 1 2 3 4 5 6 7 8 9".split(' ')), 0, 6),
                    Node::rule("opt_exponent"),
                ]),
                Node::seq([Node::t("."), Node::rule("float_digits"), Node::rule("opt_exponent")]),
                Node::seq([Node::rule("float_digits"), Node::rule("exponent")]),
            ]),
        )
        .rule("float_digits", digits("0 1 2 3 4 5 6 7 8 9", 8))
        .rule("opt_exponent", Node::choice([(3, Node::t("")), (1, Node::rule("exponent"))]))
        .rule(
            "exponent",
            Node::seq([
                Node::literals(["e", "E"]),
                Node::literals(["", "+", "-"]),
                Node::literals("0 1 2 3 4 5 6 7 8 9".split(' ')),
                Node::optional(Node::literals("0 1 2 3 4 5 6 7 8 9".split(' '))),
            ]),
        )
        .rule(
            "string",
            Node::any([
                Node::seq([
                    Node::t("\""),
                    Node::repeat(Node::rule("dq_item"), 0, 8),
                    Node::t("\""),
                ]),
                Node::seq([Node::t("'"), Node::repeat(Node::rule("sq_item"), 0, 8), Node::t("'")]),
            ]),
        )
        .rule(
            "dq_item",
            Node::choice([
                (6, Node::rule("plain_char")),
                (2, Node::rule("escape")),
                (1, Node::t("'")),
            ]),
        )
        .rule(
            "sq_item",
            Node::choice([
                (6, Node::rule("plain_char")),
                (2, Node::rule("escape")),
                (1, Node::t("\"")),
            ]),
        )
        .rule(
            "plain_char",
            Node::literals([
                "a", "b", "z", " ", "0", "#", "λ", "é", "\t", "\u{1F600}", "€", "{", "}", "\u{0C}",
            ]),
        )
        .rule(
            "escape",
            Node::literals([
                "\\n", "\\t", "\\r", "\\\\", "\\\"", "\\'", "\\0", "\\x41", "\\xff", "\\u00e9",
                "\\u2603", "\\q",
            ]),
        )
        .rule(
            "ws",
            Node::choice([
                (8, Node::t(" ")),
                (2, Node::t("")),
                (1, Node::t("  ")),
                (1, Node::t("\t")),
                (1, Node::t("\u{0C}")),
            ]),
        )
        .rule("ws1", Node::choice([(4, Node::t(" ")), (1, Node::t("\t"))]))
        .start(START)
        .build()
}

/// Integer literals only; the start rule is `int_literal`.
pub fn int_literal_grammar() -> Result<Grammar, GrammarError> {
    grammar()?.with_start(INT_LITERAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, GenConfig};
    use crate::lexer::tokenize;
    use crate::parser::parse_module;

    #[test]
    fn builds() {
        let g = grammar().unwrap();
        assert_eq!(g.start_rule(), START);
        assert!(g.min_cost(START).is_some());
    }

    #[test]
    fn cheapest_module_is_valid() {
        let g = grammar().unwrap();
        let text = g.cheapest();
        assert!(tokenize(&text).is_ok(), "{text:?}");
        assert!(parse_module(&text).is_ok(), "{text:?}");
    }

    #[test]
    fn generated_source_tokenizes_and_parses() {
        let g = grammar().unwrap();
        let config = GenConfig::default();
        for seed in 0..300 {
            let text = generate(&g, seed, &config).unwrap().value;
            tokenize(&text).unwrap_or_else(|e| panic!("seed {seed}: {e} in {text:?}"));
            parse_module(&text).unwrap_or_else(|e| panic!("seed {seed}: {e} in {text:?}"));
        }
    }

    #[test]
    fn int_literals_lex_as_single_token() {
        let g = int_literal_grammar().unwrap();
        let config = GenConfig::default();
        for seed in 0..200 {
            let text = generate(&g, seed, &config).unwrap().value;
            let tokens = tokenize(&text).unwrap();
            assert_eq!(tokens.len(), 1, "{text:?} -> {tokens:?}");
        }
    }
}

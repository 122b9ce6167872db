//! Contracts of the tokenizer, parser and unparser over grammar-generated
//! source text.

use crate::diagnostics::{RegistryError, SourceError, render_source_error};
use crate::generator::Generator;
use crate::grammar::python;
use crate::lexer::{self, Lexeme, significant, tokenize, untokenize, untokenize_positional};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::parser::{ast::Module, parse_module};
use crate::pretty::unparse;
use crate::property::Property;
use crate::registry::Registry;
use crate::span::Spanned;

pub const MODULE_TAG: &str = "source.module";
pub const INT_LITERAL_TAG: &str = "source.int_literal";

fn failed(source: &str, err: SourceError) -> TargetError {
    TargetError::failed(render_source_error(source, &err))
}

pub fn lex(source: &String) -> TargetResult<Vec<Spanned<Lexeme>>> {
    tokenize(source).map_err(|e| failed(source, e))
}

fn parse(source: &String) -> TargetResult<Module> {
    parse_module(source).map_err(|e| failed(source, e))
}

/// Kind and text of the significant tokens.
fn token_stream(source: &String) -> TargetResult<Vec<(lexer::Token, String)>> {
    lex(source).map(|tokens| significant(&tokens))
}

/// Radix-prefix evaluation through the standard library parser.
fn reference_int_value(text: &String) -> TargetResult<Option<u128>> {
    let (radix, digits) = match text.get(..2) {
        Some("0x" | "0X") => (16, &text[2..]),
        Some("0o" | "0O") => (8, &text[2..]),
        Some("0b" | "0B") => (2, &text[2..]),
        _ => (10, text.as_str()),
    };
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    Ok(u128::from_str_radix(&digits, radix).ok())
}

/// Evaluation through the tokenizer: the text must lex as one integer token.
fn lexed_int_value(text: &String) -> TargetResult<Option<u128>> {
    let tokens = lex(text)?;
    match tokens.as_slice() {
        [only] if only.node.kind.is_int() => Ok(lexer::int_value(&only.node.text)),
        _ => Err(TargetError::failed(format!("{text:?} is not a single integer token"))),
    }
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(MODULE_TAG, python::grammar()?.boxed())?;
    registry.generators.register(INT_LITERAL_TAG, python::int_literal_grammar()?.boxed())?;
    let module = registry.generators.get::<String>(MODULE_TAG)?;
    let int_literal = registry.generators.get::<String>(INT_LITERAL_TAG)?;

    registry.properties.register(Property::new(
        "source.tokenize_round_trip",
        "untokenize(tokenize(s)) reproduces s exactly",
        module.clone(),
        Oracle::round_trip(lex, |tokens: &Vec<Spanned<Lexeme>>| Ok(untokenize(tokens))),
    ))?;

    registry.properties.register(Property::new(
        "source.token_stream_stable",
        "re-spacing source from token positions keeps the significant token stream",
        module.clone(),
        Oracle::metamorphic(
            "positional untokenize",
            |s: &String| lex(s).map(|tokens| untokenize_positional(&tokens)),
            token_stream,
            |a, b| a == b,
        ),
    ))?;

    registry.properties.register(Property::new(
        "source.unparse_round_trip",
        "parse(unparse(parse(s))) == parse(s)",
        module,
        Oracle::metamorphic(
            "canonical unparse",
            |s: &String| parse(s).map(|m| unparse(&m)),
            parse,
            |a, b| a == b,
        ),
    ))?;

    registry.properties.register(Property::new(
        "source.int_literal_value",
        "integer literal values agree with the standard radix parser",
        int_literal,
        Oracle::differential("tokenizer", lexed_int_value, "from_str_radix", reference_int_value),
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Verdict;

    #[test]
    fn octal_literal_round_trips() {
        let oracle =
            Oracle::round_trip(lex, |tokens: &Vec<Spanned<Lexeme>>| Ok(untokenize(tokens)));
        assert_eq!(oracle.evaluate(&"x = 0o17\n".to_string()), Verdict::Hold);
    }

    #[test]
    fn int_values_agree() {
        for text in ["0o17", "0x_FF", "1_000", "340282366920938463463374607431768211456"] {
            let text = text.to_string();
            let lexed = lexed_int_value(&text).unwrap();
            assert_eq!(lexed, reference_int_value(&text).unwrap(), "{text}");
        }
    }

    #[test]
    fn tokenize_error_is_a_failure() {
        let err = lex(&"x = $".to_string()).unwrap_err();
        assert!(matches!(err, TargetError::Failed(_)));
    }
}

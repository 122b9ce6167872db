//! Lossless tokenizer for the Python-like source language.
//!
//! Every byte of the input belongs to exactly one lexeme, trivia included,
//! so `untokenize(tokenize(s)) == s` for every `s` that tokenizes.

pub mod token;
pub use token::{is_keyword, Token};

use logos::Logos;
use serde::{Deserialize, Serialize};

use crate::diagnostics::SourceError;
use crate::span::{LineIndex, Position, Span, Spanned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexeme {
    pub kind: Token,
    pub text: String,
    pub start: Position,
    pub end: Position,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned<Lexeme>>, SourceError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(kind) => {
                let lexeme = Lexeme {
                    kind,
                    text: lexer.slice().to_string(),
                    start: index.position(span.start),
                    end: index.position(span.end),
                };
                tokens.push(Spanned::new(lexeme, Span::new(span.start, span.end)));
            }
            Err(()) => {
                let found = &source[span.start..span.end];
                let msg = if found.starts_with(['"', '\'']) {
                    "unterminated string literal".to_string()
                } else {
                    format!("unexpected character {found:?}")
                };
                return Err(SourceError::tokenize(msg, Span::new(span.start, span.end)));
            }
        }
    }

    Ok(tokens)
}

/// Exact reconstitution: concatenates every lexeme, trivia included.
pub fn untokenize(tokens: &[Spanned<Lexeme>]) -> String {
    tokens.iter().map(|t| t.node.text.as_str()).collect()
}

/// Reconstitution from significant tokens and their positions only.
///
/// Whitespace is re-synthesized as spaces and line continuations as `\`
/// followed by a newline. The text differs from the original but must
/// tokenize to the same significant stream.
pub fn untokenize_positional(tokens: &[Spanned<Lexeme>]) -> String {
    let mut out = String::new();
    let mut at = Position::new(0, 0);
    for tok in tokens.iter().filter(|t| !t.node.kind.is_trivia()) {
        let start = tok.node.start;
        while at.line < start.line {
            out.push_str("\\\n");
            at = Position::new(at.line + 1, 0);
        }
        for _ in at.column..start.column {
            out.push(' ');
        }
        out.push_str(&tok.node.text);
        at = tok.node.end;
    }
    out
}

/// Kind and text of every non-trivia token.
pub fn significant(tokens: &[Spanned<Lexeme>]) -> Vec<(Token, String)> {
    tokens
        .iter()
        .filter(|t| !t.node.kind.is_trivia())
        .map(|t| (t.node.kind, t.node.text.clone()))
        .collect()
}

/// Value of an integer literal, evaluated digit by digit. `None` when the
/// text is not an integer literal or the value does not fit in 128 bits.
pub fn int_value(text: &str) -> Option<u128> {
    let (radix, digits) = match text.get(..2) {
        Some("0x" | "0X") => (16, &text[2..]),
        Some("0o" | "0O") => (8, &text[2..]),
        Some("0b" | "0B") => (2, &text[2..]),
        _ => (10, text),
    };
    let mut value: u128 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(radix)?;
        value = value.checked_mul(u128::from(radix))?.checked_add(u128::from(d))?;
        seen_digit = true;
    }
    seen_digit.then_some(value)
}

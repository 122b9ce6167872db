pub mod ast;

use crate::diagnostics::SourceError;
use crate::lexer::{self, int_value, Lexeme, Token};
use crate::span::{Span, Spanned};
use ast::*;

pub struct Parser<'a> {
    tokens: Vec<&'a Spanned<Lexeme>>,
    source: &'a str,
    pos: usize,
}

/// Tokenize and parse a whole module.
pub fn parse_module(source: &str) -> Result<Module, SourceError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(&tokens, source).parse_module()
}

impl<'a> Parser<'a> {
    /// Trivia and comments are dropped up front.
    pub fn new(tokens: &'a [Spanned<Lexeme>], source: &'a str) -> Self {
        let tokens = tokens
            .iter()
            .filter(|t| !t.node.kind.is_trivia() && t.node.kind != Token::Comment)
            .collect();
        Self { tokens, source, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Spanned<Lexeme>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<Token> {
        self.peek().map(|t| t.node.kind)
    }

    fn advance(&mut self) -> Option<&'a Spanned<Lexeme>> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn eof_span(&self) -> Span {
        Span::new(self.source.len(), self.source.len())
    }

    fn expect(&mut self, expected: Token) -> Result<&'a Spanned<Lexeme>, SourceError> {
        match self.peek() {
            Some(tok) if tok.node.kind == expected => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(SourceError::parse(
                format!("expected {expected}, found {}", tok.node.kind),
                tok.span,
            )),
            None => Err(SourceError::parse(
                format!("expected {expected}, found end of file"),
                self.eof_span(),
            )),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(Token::Newline))
    }

    pub fn parse_module(&mut self) -> Result<Module, SourceError> {
        let mut module = Module::default();
        while let Some(kind) = self.peek_kind() {
            if kind == Token::Newline {
                self.pos += 1;
                continue;
            }
            module.body.push(self.parse_stmt()?);
            if !self.at_statement_end() {
                let tok = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
                return Err(SourceError::parse("expected end of statement", tok));
            }
        }
        Ok(module)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, SourceError> {
        match self.peek_kind() {
            Some(kind @ (Token::If | Token::While)) => {
                self.pos += 1;
                let test = self.parse_expr(0)?;
                self.expect(Token::Colon)?;
                let body = Box::new(self.parse_simple()?);
                Ok(if kind == Token::If {
                    Stmt::If { test, body }
                } else {
                    Stmt::While { test, body }
                })
            }
            _ => self.parse_simple(),
        }
    }

    fn parse_simple(&mut self) -> Result<Stmt, SourceError> {
        match self.peek_kind() {
            Some(Token::Pass) => {
                self.pos += 1;
                Ok(Stmt::Pass)
            }
            Some(Token::Return) => {
                self.pos += 1;
                if self.at_statement_end() {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.parse_expr(0)?)))
                }
            }
            _ => {
                let start = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
                let expr = self.parse_expr(0)?;
                if self.peek_kind() != Some(Token::Assign) {
                    return Ok(Stmt::Expr(expr));
                }
                self.pos += 1;
                let Expr::Name(target) = expr else {
                    return Err(SourceError::parse("cannot assign to expression", start));
                };
                let value = self.parse_expr(0)?;
                Ok(Stmt::Assign { target, value })
            }
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, SourceError> {
        let mut lhs = self.parse_prefix()?;

        while let Some(op) = self.peek_kind().and_then(binary_op) {
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, SourceError> {
        let tok = self.advance().ok_or_else(|| {
            SourceError::parse("unexpected end of file in expression", self.eof_span())
        })?;
        let text = tok.node.text.as_str();

        match tok.node.kind {
            Token::Name => {
                if self.peek_kind() == Some(Token::LParen) {
                    self.pos += 1;
                    let args = self.parse_call_args()?;
                    Ok(Expr::Call { func: text.to_string(), args })
                } else {
                    Ok(Expr::Name(text.to_string()))
                }
            }
            Token::DecInt | Token::HexInt | Token::OctInt | Token::BinInt => int_value(text)
                .map(Expr::Int)
                .ok_or_else(|| SourceError::parse("integer literal too large", tok.span)),
            Token::Float => {
                let value: f64 = text
                    .replace('_', "")
                    .parse()
                    .map_err(|_| SourceError::parse("malformed float literal", tok.span))?;
                if !value.is_finite() {
                    return Err(SourceError::parse("float literal out of range", tok.span));
                }
                Ok(Expr::Float(value))
            }
            Token::Str => decode_string(text)
                .map(Expr::Str)
                .map_err(|msg| SourceError::parse(msg, tok.span)),
            Token::TrueLit => Ok(Expr::Bool(true)),
            Token::FalseLit => Ok(Expr::Bool(false)),
            Token::NoneLit => Ok(Expr::NoneLit),
            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Minus | Token::Plus | Token::Tilde | Token::Not => {
                let (op, bp) = match tok.node.kind {
                    Token::Minus => (UnaryOp::Neg, UNARY_BP),
                    Token::Plus => (UnaryOp::Pos, UNARY_BP),
                    Token::Tilde => (UnaryOp::Invert, UNARY_BP),
                    _ => (UnaryOp::Not, NOT_BP),
                };
                let operand = self.parse_expr(bp)?;
                Ok(Expr::Unary { op, operand: Box::new(operand) })
            }
            other => Err(SourceError::parse(
                format!("unexpected {other} in expression"),
                tok.span,
            )),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, SourceError> {
        let mut args = Vec::new();
        if self.peek_kind() == Some(Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(0)?);
            if self.peek_kind() == Some(Token::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }
}

const NOT_BP: u8 = 5;
const UNARY_BP: u8 = 13;

fn binary_op(kind: Token) -> Option<BinOp> {
    Some(match kind {
        Token::Or => BinOp::Or,
        Token::And => BinOp::And,
        Token::EqEq => BinOp::Eq,
        Token::NotEq => BinOp::NotEq,
        Token::Lt => BinOp::Lt,
        Token::LtEq => BinOp::LtEq,
        Token::Gt => BinOp::Gt,
        Token::GtEq => BinOp::GtEq,
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Star => BinOp::Mul,
        Token::Slash => BinOp::Div,
        Token::SlashSlash => BinOp::FloorDiv,
        Token::Percent => BinOp::Mod,
        Token::StarStar => BinOp::Pow,
        _ => return None,
    })
}

fn infix_binding_power(op: BinOp) -> (u8, u8) {
    match op {
        BinOp::Or => (1, 2),
        BinOp::And => (3, 4),
        BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => (7, 8),
        BinOp::Add | BinOp::Sub => (9, 10),
        BinOp::Mul | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => (11, 12),
        // Right-associative, and binds tighter than a unary minus on its left
        BinOp::Pow => (16, 15),
    }
}

/// Decode a quoted string literal. Unknown escapes keep their backslash.
pub fn decode_string(literal: &str) -> Result<String, String> {
    let mut chars = literal.chars();
    let quote = chars.next().ok_or("empty string literal")?;
    if chars.next_back() != Some(quote) {
        return Err("unterminated string literal".into());
    }
    let mut out = String::new();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or("dangling backslash")?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' => out.push(escaped),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, width: usize) -> Result<char, String> {
    let digits: String = chars.take(width).collect();
    if digits.len() != width {
        return Err(format!("truncated \\{} escape", if width == 2 { 'x' } else { 'u' }));
    }
    let code = u32::from_str_radix(&digits, 16)
        .map_err(|_| format!("invalid escape digits {digits:?}"))?;
    char::from_u32(code).ok_or_else(|| format!("escape {code:#x} is not a character"))
}

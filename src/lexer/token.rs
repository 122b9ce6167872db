use logos::Logos;
use serde::{Deserialize, Serialize};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    // Trivia: dropped by the parser and by positional reconstitution
    #[regex(r"[ \t\x0C]+")]
    Whitespace,
    #[regex(r"\\\r?\n")]
    Continuation,

    // Kept in the significant stream, skipped by the parser
    #[regex(r"#[^\r\n]*")]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    // Keywords
    #[token("if")]
    If,
    #[token("while")]
    While,
    #[token("pass")]
    Pass,
    #[token("return")]
    Return,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("True")]
    TrueLit,
    #[token("False")]
    FalseLit,
    #[token("None")]
    NoneLit,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,

    // Literals
    #[regex(r"0[xX](_?[0-9a-fA-F])+")]
    HexInt,
    #[regex(r"0[oO](_?[0-7])+")]
    OctInt,
    #[regex(r"0[bB](_?[01])+")]
    BinInt,
    #[regex(r"0(_?0)*|[1-9](_?[0-9])*")]
    DecInt,
    #[regex(r"([0-9](_?[0-9])*\.([0-9](_?[0-9])*)?|\.[0-9](_?[0-9])*)([eE][+-]?[0-9](_?[0-9])*)?")]
    #[regex(r"[0-9](_?[0-9])*[eE][+-]?[0-9](_?[0-9])*")]
    Float,
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*""#)]
    #[regex(r#"'([^'\\\r\n]|\\[^\r\n])*'"#)]
    Str,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("//")]
    SlashSlash,
    #[token("%")]
    Percent,
    #[token("~")]
    Tilde,
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

impl Token {
    pub fn is_trivia(self) -> bool {
        matches!(self, Token::Whitespace | Token::Continuation)
    }

    pub fn is_int(self) -> bool {
        matches!(self, Token::DecInt | Token::HexInt | Token::OctInt | Token::BinInt)
    }
}

/// Returns true if the given string lexes as a keyword.
pub fn is_keyword(s: &str) -> bool {
    matches!(
        s,
        "if" | "while" | "pass" | "return" | "not" | "and" | "or" | "True" | "False" | "None"
    )
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Whitespace => write!(f, "whitespace"),
            Token::Continuation => write!(f, "line continuation"),
            Token::Comment => write!(f, "comment"),
            Token::Newline => write!(f, "newline"),
            Token::If => write!(f, "if"),
            Token::While => write!(f, "while"),
            Token::Pass => write!(f, "pass"),
            Token::Return => write!(f, "return"),
            Token::Not => write!(f, "not"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::TrueLit => write!(f, "True"),
            Token::FalseLit => write!(f, "False"),
            Token::NoneLit => write!(f, "None"),
            Token::Name => write!(f, "name"),
            Token::HexInt | Token::OctInt | Token::BinInt | Token::DecInt => write!(f, "integer"),
            Token::Float => write!(f, "float"),
            Token::Str => write!(f, "string"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::StarStar => write!(f, "**"),
            Token::Slash => write!(f, "/"),
            Token::SlashSlash => write!(f, "//"),
            Token::Percent => write!(f, "%"),
            Token::Tilde => write!(f, "~"),
            Token::Assign => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
        }
    }
}

use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

/// Grammar misconfiguration. Always detected when the grammar is built, never
/// during generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar has no rules")]
    Empty,

    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),

    #[error("rule `{rule}` references undefined rule `{missing}`")]
    UndefinedRule { rule: String, missing: String },

    #[error("start rule `{0}` is not defined")]
    UnknownStart(String),

    #[error("rule `{rule}` contains a choice with no alternatives")]
    EmptyChoice { rule: String },

    #[error("rule `{rule}` gives alternative {alternative} a zero weight")]
    ZeroWeight { rule: String, alternative: usize },

    #[error("rule `{rule}` has a repeat with min {min} greater than max {max}")]
    InvalidRepeat { rule: String, min: usize, max: usize },

    #[error("rules with no finite expansion: {}", .rules.join(", "))]
    Unproductive { rules: Vec<String> },
}

/// Why generation stopped before producing a value. Partially built
/// candidates are dropped, never evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Abandoned {
    #[error("generation cancelled")]
    Cancelled,

    #[error("wall-clock deadline reached")]
    DeadlineExceeded,

    #[error("more than {0} draws in one candidate")]
    Overrun(usize),
}

/// Tokenizer and parser failures on source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("tokenize error: {msg}")]
    Tokenize { msg: String, span: Span },

    #[error("parse error: {msg}")]
    Parse { msg: String, span: Span },
}

impl SourceError {
    pub fn tokenize(msg: impl Into<String>, span: Span) -> Self {
        Self::Tokenize { msg: msg.into(), span }
    }

    pub fn parse(msg: impl Into<String>, span: Span) -> Self {
        Self::Parse { msg: msg.into(), span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Tokenize { span, .. } | Self::Parse { span, .. } => *span,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var} has invalid value `{value}`")]
    Env { var: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure-database errors. These never fail a run; the harness logs them and
/// continues in memory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid magic number: expected STPF")]
    InvalidMagic,
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
    #[error("truncated file: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("bincode encode error: {0}")]
    Encode(String),
    #[error("bincode decode error: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// The file was read but its contents are unusable.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, StoreError::Io(_) | StoreError::Encode(_))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("generator tag `{0}` is already registered")]
    DuplicateGenerator(String),

    #[error("property `{0}` is already registered")]
    DuplicateProperty(String),

    #[error("no generator registered under tag `{0}`")]
    UnknownGenerator(String),

    #[error("generator `{tag}` does not produce values of type {expected}")]
    TypeMismatch { tag: String, expected: &'static str },

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

fn char_offset(text: &str, byte: usize) -> usize {
    text.get(..byte).map(|s| s.chars().count()).unwrap_or(byte)
}

fn plain_config() -> ariadne::Config {
    ariadne::Config::default().with_color(false)
}

/// Render a tokenizer or parser error against its source text.
pub fn render_source_error(source: &str, err: &SourceError) -> String {
    use ariadne::{Label, Report, ReportKind, Source};

    let span = err.span();
    let (start, end) = (char_offset(source, span.start), char_offset(source, span.end));
    let (kind, msg) = match err {
        SourceError::Tokenize { msg, .. } => ("tokenize", msg),
        SourceError::Parse { msg, .. } => ("parse", msg),
    };
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, (), start)
        .with_config(plain_config())
        .with_message(format!("{kind} error"))
        .with_label(Label::new(start..end.max(start + 1)).with_message(msg))
        .finish()
        .write(Source::from(source), &mut buf);
    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{kind} error at {}..{}: {msg}", span.start, span.end),
    }
}

/// Byte offset of the first difference between two texts, if they differ.
pub fn first_divergence(expected: &str, actual: &str) -> Option<usize> {
    if expected == actual {
        return None;
    }
    let common = expected
        .char_indices()
        .zip(actual.chars())
        .find(|((_, a), b)| a != b)
        .map(|((i, _), _)| i);
    Some(common.unwrap_or_else(|| expected.len().min(actual.len())))
}

/// Render where a reconstituted text first departs from the original.
pub fn render_divergence(expected: &str, actual: &str) -> Option<String> {
    use ariadne::{Label, Report, ReportKind, Source};

    let at = first_divergence(expected, actual)?;
    let found = actual[at..].chars().next();
    let wanted = expected[at..].chars().next();
    let msg = match (wanted, found) {
        (Some(w), Some(f)) => format!("expected {w:?}, reconstituted {f:?}"),
        (Some(w), None) => format!("reconstituted text ends before {w:?}"),
        (None, Some(f)) => format!("reconstituted text continues with {f:?}"),
        (None, None) => "texts differ".to_string(),
    };
    let start = char_offset(expected, at);
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, (), start)
        .with_config(plain_config())
        .with_message("round trip diverges")
        .with_label(Label::new(start..start + 1).with_message(&msg))
        .finish()
        .write(Source::from(expected), &mut buf);
    Some(match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("diverges at byte {at}: {msg}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_at_first_differing_char() {
        assert_eq!(first_divergence("x = 0o17", "x=0o17"), Some(1));
        assert_eq!(first_divergence("abc", "abc"), None);
    }

    #[test]
    fn divergence_on_prefix() {
        assert_eq!(first_divergence("abc", "ab"), Some(2));
        assert_eq!(first_divergence("ab", "abc"), Some(2));
    }

    #[test]
    fn divergence_is_char_aligned() {
        assert_eq!(first_divergence("éa", "éb"), Some(2));
    }

    #[test]
    fn render_divergence_mentions_both_chars() {
        let rendered = render_divergence("x = 1", "x = 2").unwrap();
        assert!(rendered.contains("round trip diverges"));
        assert!(rendered.contains("'1'"));
        assert!(rendered.contains("'2'"));
    }

    #[test]
    fn render_source_error_has_message() {
        let err = SourceError::tokenize("unexpected character '$'", Span::new(2, 3));
        let rendered = render_source_error("x $ y", &err);
        assert!(rendered.contains("tokenize error"));
        assert!(rendered.contains("unexpected character"));
    }

    #[test]
    fn unproductive_lists_rules() {
        let err = GrammarError::Unproductive { rules: vec!["a".into(), "b".into()] };
        assert_eq!(err.to_string(), "rules with no finite expansion: a, b");
    }
}

//! Regular expressions checked by construction.
//!
//! A pattern is generated as a syntax tree together with a subject string
//! the tree is known to match, or known not to match. The `regex` engine,
//! anchored at the start of the subject, must agree. Every atom consumes
//! exactly one character, which is what makes the non-matching strings
//! sound: a repetition needing `min` atoms cannot match a string whose
//! first `min` characters include one the atom rejects.

use std::fmt::Write as _;

use regex::Regex;

use crate::diagnostics::{Abandoned, RegistryError};
use crate::generator::combinators::draw_count;
use crate::generator::{Budget, DrawSource, Generator};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::property::Property;
use crate::registry::Registry;

pub const CASE_TAG: &str = "regex.case";

const MAX_REPEAT: usize = 7;

/// Ordinary characters, including a few outside ASCII and the BMP.
const CHARS: &[char] = &[
    'a', 'b', 'z', 'A', 'Z', '0', '9', ' ', '\t', '\n', '_', 'é', 'ß', 'Ω', '中', '🦀',
];

/// Characters with syntactic meaning somewhere in a pattern.
const SPECIALS: &[char] = &[
    '.', '^', '$', '*', '+', '?', '{', '}', '\\', '[', ']', '-', '|', '(', ')', '#', '&', '~',
    '=', '!',
];

/// Decimal digits (general category Nd) from several scripts.
const DIGITS: &[char] = &['0', '5', '9', '٣', '९'];

const NON_DIGITS: &[char] = &['a', 'Z', ' ', 'é', '中', '_', '½', '\n'];

fn pick(src: &mut DrawSource, chars: &[char]) -> Result<char, Abandoned> {
    Ok(chars[src.draw_offset(chars.len() as u64 - 1)? as usize])
}

fn any_char(src: &mut DrawSource) -> Result<char, Abandoned> {
    let i = src.draw_offset((CHARS.len() + SPECIALS.len()) as u64 - 1)? as usize;
    Ok(if i < CHARS.len() { CHARS[i] } else { SPECIALS[i - CHARS.len()] })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetItem {
    Char(char),
    Range(char, char),
}

impl SetItem {
    fn contains(self, c: char) -> bool {
        match self {
            SetItem::Char(x) => x == c,
            SetItem::Range(lo, hi) => (lo..=hi).contains(&c),
        }
    }

    fn last(self) -> char {
        match self {
            SetItem::Char(c) | SetItem::Range(_, c) => c,
        }
    }

    fn member(self, src: &mut DrawSource) -> Result<char, Abandoned> {
        match self {
            SetItem::Char(c) => Ok(c),
            SetItem::Range(lo, hi) => {
                let c = src.draw_int(i64::from(u32::from(lo)), i64::from(u32::from(hi)))?;
                Ok(char::from_u32(c as u32).unwrap_or(lo))
            }
        }
    }
}

/// A pattern element that consumes exactly one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Literal(char),
    Dot,
    Digit { negated: bool },
    Set { items: Vec<SetItem>, negated: bool },
}

impl Atom {
    fn render(&self, out: &mut String) {
        match self {
            Atom::Literal(c) => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            Atom::Dot => out.push('.'),
            Atom::Digit { negated: false } => out.push_str("\\d"),
            Atom::Digit { negated: true } => out.push_str("\\D"),
            Atom::Set { items, negated } => {
                out.push('[');
                if *negated {
                    out.push('^');
                }
                for item in items {
                    match item {
                        SetItem::Char(c) => {
                            out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])))
                        }
                        SetItem::Range(lo, hi) => {
                            out.push_str(&regex::escape(lo.encode_utf8(&mut [0; 4])));
                            out.push('-');
                            out.push_str(&regex::escape(hi.encode_utf8(&mut [0; 4])));
                        }
                    }
                }
                out.push(']');
            }
        }
    }

    /// Characters outside a set: pool characters it does not contain, plus
    /// the first scalar value above every member.
    fn outside(items: &[SetItem]) -> Vec<char> {
        let mut chars: Vec<char> = CHARS
            .iter()
            .chain(SPECIALS)
            .copied()
            .filter(|&c| !items.iter().any(|item| item.contains(c)))
            .collect();
        let max = items.iter().map(|item| u32::from(item.last())).max().unwrap_or(0);
        chars.extend((max + 1..=u32::from(char::MAX)).find_map(char::from_u32));
        chars
    }

    fn matching(&self, src: &mut DrawSource) -> Result<char, Abandoned> {
        match self {
            Atom::Literal(c) => Ok(*c),
            Atom::Dot => {
                let not_newline: Vec<char> = CHARS.iter().copied().filter(|&c| c != '\n').collect();
                pick(src, &not_newline)
            }
            Atom::Digit { negated: false } => pick(src, DIGITS),
            Atom::Digit { negated: true } => pick(src, NON_DIGITS),
            Atom::Set { items, negated: false } => pick_item(src, items)?.member(src),
            Atom::Set { items, negated: true } => pick(src, &Atom::outside(items)),
        }
    }

    fn non_matching(&self, src: &mut DrawSource) -> Result<Option<char>, Abandoned> {
        let c = match self {
            Atom::Literal(c) => {
                let others: Vec<char> =
                    CHARS.iter().chain(SPECIALS).copied().filter(|x| x != c).collect();
                pick(src, &others)?
            }
            Atom::Dot => '\n',
            Atom::Digit { negated: false } => pick(src, NON_DIGITS)?,
            Atom::Digit { negated: true } => pick(src, DIGITS)?,
            Atom::Set { items, negated: false } => {
                let outside = Atom::outside(items);
                if outside.is_empty() {
                    return Ok(None);
                }
                pick(src, &outside)?
            }
            Atom::Set { items, negated: true } => pick_item(src, items)?.member(src)?,
        };
        Ok(Some(c))
    }
}

fn pick_item(src: &mut DrawSource, items: &[SetItem]) -> Result<SetItem, Abandoned> {
    Ok(items[src.draw_offset(items.len() as u64 - 1)? as usize])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Star,
    Plus,
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Quantifier {
    fn bounds(self) -> (usize, usize) {
        match self {
            Quantifier::Star => (0, MAX_REPEAT),
            Quantifier::Plus => (1, MAX_REPEAT),
            Quantifier::Exactly(n) => (n, n),
            Quantifier::Between(lo, hi) => (lo, hi),
            Quantifier::AtLeast(lo) => (lo, MAX_REPEAT.max(lo)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeat {
    pub atom: Atom,
    pub quantifier: Quantifier,
    pub lazy: bool,
}

impl Repeat {
    fn render(&self, out: &mut String) {
        self.atom.render(out);
        let _ = match self.quantifier {
            Quantifier::Star => write!(out, "*"),
            Quantifier::Plus => write!(out, "+"),
            Quantifier::Exactly(n) => write!(out, "{{{n}}}"),
            Quantifier::Between(lo, hi) => write!(out, "{{{lo},{hi}}}"),
            Quantifier::AtLeast(lo) => write!(out, "{{{lo},}}"),
        };
        if self.lazy {
            out.push('?');
        }
    }

    fn can_be_empty(&self) -> bool {
        self.quantifier.bounds().0 == 0
    }

    fn matching(&self, src: &mut DrawSource) -> Result<String, Abandoned> {
        let (min, max) = self.quantifier.bounds();
        let count = min + src.draw_offset((max - min) as u64)? as usize;
        (0..count).map(|_| self.atom.matching(src)).collect()
    }

    /// Exactly `min` atoms with one of them replaced by a character the
    /// atom rejects.
    fn non_matching(&self, src: &mut DrawSource) -> Result<Option<String>, Abandoned> {
        let (min, _) = self.quantifier.bounds();
        if min == 0 {
            return Ok(None);
        }
        let bad = src.draw_offset(min as u64 - 1)? as usize;
        let mut out = String::new();
        for i in 0..min {
            if i == bad {
                match self.atom.non_matching(src)? {
                    Some(c) => out.push(c),
                    None => return Ok(None),
                }
            } else {
                out.push(self.atom.matching(src)?);
            }
        }
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Atom(Atom),
    Repeat(Repeat),
    Sequence(Vec<Repeat>),
    Alternation(Vec<Pattern>),
}

impl Pattern {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Pattern::Atom(atom) => atom.render(out),
            Pattern::Repeat(repeat) => repeat.render(out),
            Pattern::Sequence(parts) => parts.iter().for_each(|r| r.render(out)),
            Pattern::Alternation(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    alternative.render_into(out);
                }
            }
        }
    }

    pub fn matching(&self, src: &mut DrawSource) -> Result<String, Abandoned> {
        match self {
            Pattern::Atom(atom) => atom.matching(src).map(String::from),
            Pattern::Repeat(repeat) => repeat.matching(src),
            Pattern::Sequence(parts) => parts.iter().map(|r| r.matching(src)).collect(),
            Pattern::Alternation(alternatives) => {
                let i = src.draw_offset(alternatives.len() as u64 - 1)? as usize;
                alternatives[i].matching(src)
            }
        }
    }

    /// A string no prefix of which matches, when one can be built. A
    /// sequence only has one when its first part cannot match the empty
    /// string, since later parts could otherwise absorb the bad character.
    pub fn non_matching(&self, src: &mut DrawSource) -> Result<Option<String>, Abandoned> {
        match self {
            Pattern::Atom(atom) => Ok(atom.non_matching(src)?.map(String::from)),
            Pattern::Repeat(repeat) => repeat.non_matching(src),
            Pattern::Sequence(parts) => {
                let Some((first, rest)) = parts.split_first() else { return Ok(None) };
                if first.can_be_empty() {
                    return Ok(None);
                }
                let Some(mut out) = first.non_matching(src)? else { return Ok(None) };
                for part in rest {
                    out.push_str(&part.matching(src)?);
                }
                Ok(Some(out))
            }
            Pattern::Alternation(_) => Ok(None),
        }
    }
}

/// A pattern, a subject, and whether the pattern matches at the start of
/// the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexCase {
    pub pattern: String,
    pub subject: String,
    pub matches: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByConstruction;

impl ByConstruction {
    fn atom(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Atom, Abandoned> {
        budget.consume(1);
        let atom = match src.draw_weighted(&[3, 1, 2, 1, 2, 1])? {
            0 => Atom::Literal(pick(src, CHARS)?),
            1 => Atom::Dot,
            2 => Atom::Literal(pick(src, SPECIALS)?),
            3 => Atom::Digit { negated: src.draw_bool()? },
            kind => {
                let count = draw_count(src, budget, 1, 8, 1)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    budget.consume(1);
                    let first = any_char(src)?;
                    let item = if src.draw_bool()? {
                        let second = any_char(src)?;
                        match first.cmp(&second) {
                            std::cmp::Ordering::Less => SetItem::Range(first, second),
                            std::cmp::Ordering::Equal => SetItem::Char(first),
                            std::cmp::Ordering::Greater => SetItem::Range(second, first),
                        }
                    } else {
                        SetItem::Char(first)
                    };
                    items.push(item);
                }
                Atom::Set { items, negated: kind == 5 }
            }
        };
        Ok(atom)
    }

    fn repeat(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Repeat, Abandoned> {
        let atom = self.atom(src, budget)?;
        let max = MAX_REPEAT as i64;
        let quantifier = match src.draw_offset(4)? {
            0 => Quantifier::Star,
            1 => Quantifier::Plus,
            2 => Quantifier::Exactly(src.draw_int(0, max)? as usize),
            3 => {
                let lo = src.draw_int(0, max)?;
                Quantifier::Between(lo as usize, src.draw_int(lo, max)? as usize)
            }
            _ => Quantifier::AtLeast(src.draw_int(0, max)? as usize),
        };
        Ok(Repeat { atom, quantifier, lazy: src.draw_bool()? })
    }

    fn sequence(
        &self,
        src: &mut DrawSource,
        budget: &mut Budget,
    ) -> Result<Vec<Repeat>, Abandoned> {
        let count = draw_count(src, budget, 2, MAX_REPEAT, 2)?;
        (0..count).map(|_| self.repeat(src, budget)).collect()
    }

    fn pattern(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Pattern, Abandoned> {
        budget.consume(1);
        if budget.is_exhausted() {
            return self.atom(src, budget).map(Pattern::Atom);
        }
        let pattern = match src.draw_weighted(&[3, 3, 2, 1, 1])? {
            0 => Pattern::Atom(self.atom(src, budget)?),
            1 => Pattern::Repeat(self.repeat(src, budget)?),
            2 => Pattern::Sequence(self.sequence(src, budget)?),
            3 => {
                let count = draw_count(src, budget, 2, MAX_REPEAT, 1)?;
                let atoms = (0..count).map(|_| self.atom(src, budget).map(Pattern::Atom));
                Pattern::Alternation(atoms.collect::<Result<_, _>>()?)
            }
            _ => {
                let count = draw_count(src, budget, 2, MAX_REPEAT, 4)?;
                let sequences =
                    (0..count).map(|_| self.sequence(src, budget).map(Pattern::Sequence));
                Pattern::Alternation(sequences.collect::<Result<_, _>>()?)
            }
        };
        Ok(pattern)
    }
}

impl Generator for ByConstruction {
    type Value = RegexCase;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<RegexCase, Abandoned> {
        let pattern = self.pattern(src, budget)?;
        let rejected = if src.draw_bool()? { pattern.non_matching(src)? } else { None };
        let case = match rejected {
            Some(subject) => RegexCase { pattern: pattern.render(), subject, matches: false },
            None => {
                let subject = pattern.matching(src)?;
                RegexCase { pattern: pattern.render(), subject, matches: true }
            }
        };
        Ok(case)
    }
}

/// Whether `pattern` matches at the start of `subject`.
pub fn engine_matches(pattern: &str, subject: &str) -> TargetResult<bool> {
    let anchored = Regex::new(&format!("^(?:{pattern})")).map_err(TargetError::failed)?;
    Ok(anchored.is_match(subject))
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(CASE_TAG, ByConstruction.boxed())?;

    registry.properties.register(Property::new(
        "regex.match_by_construction",
        "the regex engine matches exactly the strings a pattern was built to match",
        registry.generators.get::<RegexCase>(CASE_TAG)?,
        Oracle::differential(
            "construction",
            |case: &RegexCase| Ok(case.matches),
            "regex",
            |case: &RegexCase| engine_matches(&case.pattern, &case.subject),
        ),
    ))?;

    Ok(())
}

//! Unicode normalization and substring search.

use std::fmt;

use unicode_normalization::UnicodeNormalization;

use crate::diagnostics::RegistryError;
use crate::generator::{Generator, int_range, one_of, select, string_of};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::property::Property;
use crate::registry::Registry;

pub const TEXT_TAG: &str = "text.unicode";
pub const AFFIXED_TAG: &str = "text.affixed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
}

impl Form {
    pub fn apply(self, s: &str) -> String {
        match self {
            Form::Nfc => s.nfc().collect(),
            Form::Nfd => s.nfd().collect(),
            Form::Nfkc => s.nfkc().collect(),
            Form::Nfkd => s.nfkd().collect(),
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Form::Nfc => "NFC",
            Form::Nfd => "NFD",
            Form::Nfkc => "NFKC",
            Form::Nfkd => "NFKD",
        };
        f.write_str(name)
    }
}

/// Applying the first form and then the second equals applying the third
/// directly (UAX #15 design goals).
pub const COMPOSITIONS: [(Form, Form, Form); 16] = {
    use Form::*;
    [
        (Nfc, Nfc, Nfc),
        (Nfc, Nfd, Nfd),
        (Nfc, Nfkc, Nfkc),
        (Nfc, Nfkd, Nfkd),
        (Nfd, Nfc, Nfc),
        (Nfd, Nfd, Nfd),
        (Nfd, Nfkc, Nfkc),
        (Nfd, Nfkd, Nfkd),
        (Nfkc, Nfc, Nfkc),
        (Nfkc, Nfd, Nfkd),
        (Nfkc, Nfkc, Nfkc),
        (Nfkc, Nfkd, Nfkd),
        (Nfkd, Nfc, Nfkc),
        (Nfkd, Nfd, Nfkd),
        (Nfkd, Nfkc, Nfkc),
        (Nfkd, Nfkd, Nfkd),
    ]
};

/// Characters with interesting decompositions: combining marks, precomposed
/// letters, compatibility forms and conjoining jamo.
const NORMALIZATION_CHARS: &[char] = &[
    'a', 'e', 'é', '\u{301}', '\u{327}', '\u{323}', '\u{307}', 'ẛ', '\u{212b}', '\u{2126}', 'ﬁ',
    '²', '①', '\u{1100}', '\u{1161}', '\u{11a8}', '가', 'Å', '\u{0f73}', '\u{fb2c}',
];

/// Mostly characters from the normalization pool, sometimes any scalar value.
fn unicode_char() -> impl Generator<Value = char> {
    one_of(vec![
        (3, select(NORMALIZATION_CHARS.to_vec()).boxed()),
        (1, int_range(0, 0x10ffff).map(|c| char::from_u32(c as u32).unwrap_or('\u{fffd}')).boxed()),
    ])
}

/// A small alphabet so that needles recur inside their affixes.
const SEARCH_CHARS: &[char] = &['a', 'b', 'é', '\u{301}', '中'];

fn search_text() -> impl Generator<Value = String> {
    string_of(select(SEARCH_CHARS.to_vec()), 0, 6)
}

pub type Affixed = (String, String, String);

/// Byte offsets of `needle` in `prefix + needle + suffix`, measured from the
/// end of the prefix: the unbounded search and the search restricted to the
/// needle's own span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub anywhere: i64,
    pub bounded: i64,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    First,
    Last,
}

fn locate(direction: Direction, (prefix, needle, suffix): &Affixed) -> TargetResult<Located> {
    let haystack = format!("{prefix}{needle}{suffix}");
    let (lo, hi) = (prefix.len(), haystack.len() - suffix.len());
    let (found, matched, bounded) = match direction {
        Direction::First => (
            haystack.find(needle.as_str()),
            haystack.match_indices(needle.as_str()).next().map(|(i, _)| i),
            haystack[lo..hi].find(needle.as_str()),
        ),
        Direction::Last => (
            haystack.rfind(needle.as_str()),
            haystack.rmatch_indices(needle.as_str()).next().map(|(i, _)| i),
            haystack[lo..hi].rfind(needle.as_str()),
        ),
    };
    if found != matched {
        return Err(TargetError::failed(format!(
            "search returned {found:?} but the match iterator {matched:?}"
        )));
    }
    let found = found.ok_or_else(|| TargetError::failed("needle not found in its own haystack"))?;
    let bounded =
        bounded.ok_or_else(|| TargetError::failed("needle not found within its own span"))?;
    Ok(Located { anywhere: found as i64 - lo as i64, bounded: bounded as i64 })
}

fn strip_affixes((_, needle, _): &Affixed) -> TargetResult<Affixed> {
    Ok((String::new(), needle.clone(), String::new()))
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(TEXT_TAG, string_of(unicode_char(), 0, 12).boxed())?;
    let affixes = (search_text(), search_text(), search_text());
    registry.generators.register(AFFIXED_TAG, affixes.boxed())?;
    let text = registry.generators.get::<String>(TEXT_TAG)?;
    let affixed = registry.generators.get::<Affixed>(AFFIXED_TAG)?;

    registry.properties.register(Property::new(
        "text.normalization_composition",
        "normalizing with one form then another equals normalizing with the composed form",
        (int_range(0, COMPOSITIONS.len() as i64 - 1), text),
        Oracle::differential(
            "composed",
            |(i, s): &(i64, String)| {
                let (first, then, _) = COMPOSITIONS[*i as usize];
                Ok(then.apply(&first.apply(s)))
            },
            "direct",
            |(i, s): &(i64, String)| Ok(COMPOSITIONS[*i as usize].2.apply(s)),
        ),
    ))?;

    registry.properties.register(Property::new(
        "text.find_within_affixes",
        "affixes never push the first match past the prefix; a bounded search finds it there",
        affixed.clone(),
        Oracle::metamorphic(
            "strip affixes",
            strip_affixes,
            |x: &Affixed| locate(Direction::First, x),
            |with: &Located, without: &Located| {
                with.bounded == without.bounded && with.anywhere <= without.anywhere
            },
        ),
    ))?;

    registry.properties.register(Property::new(
        "text.rfind_within_affixes",
        "affixes never pull the last match before the prefix; a bounded rfind finds it there",
        affixed,
        Oracle::metamorphic(
            "strip affixes",
            strip_affixes,
            |x: &Affixed| locate(Direction::Last, x),
            |with: &Located, without: &Located| {
                with.bounded == without.bounded && with.anywhere >= without.anywhere
            },
        ),
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn affixed(prefix: &str, needle: &str, suffix: &str) -> Affixed {
        (prefix.into(), needle.into(), suffix.into())
    }

    #[test]
    fn compositions_hold_on_tricky_text() {
        let s = "e\u{301}\u{327}ﬁ\u{212b}\u{1100}\u{1161}\u{11a8}ẛ\u{323}";
        for (first, then, direct) in COMPOSITIONS {
            assert_eq!(then.apply(&first.apply(s)), direct.apply(s), "{first} then {then}");
        }
    }

    #[test]
    fn earlier_occurrence_in_prefix() {
        let located = locate(Direction::First, &affixed("xaby", "ab", "")).unwrap();
        assert_eq!(located, Located { anywhere: -3, bounded: 0 });
    }

    #[test]
    fn later_occurrence_in_suffix() {
        let located = locate(Direction::Last, &affixed("é", "a", "ba")).unwrap();
        assert_eq!(located, Located { anywhere: 2, bounded: 0 });
    }

    #[test]
    fn empty_needle() {
        let first = locate(Direction::First, &affixed("ab", "", "c")).unwrap();
        assert_eq!(first, Located { anywhere: -2, bounded: 0 });
        let last = locate(Direction::Last, &affixed("ab", "", "c")).unwrap();
        assert_eq!(last, Located { anywhere: 1, bounded: 0 });
    }

    #[test]
    fn relation_holds_for_stripped_value() {
        let stripped = strip_affixes(&affixed("a", "中", "b")).unwrap();
        assert_eq!(stripped, affixed("", "中", ""));
        let located = locate(Direction::First, &stripped).unwrap();
        assert_eq!(located, Located { anywhere: 0, bounded: 0 });
    }
}

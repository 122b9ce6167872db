//! Typed generators built from the same primitives as the grammar model:
//! `one_of` is a weighted choice, tuples are sequences and `vec_of` is a
//! bounded repeat.

use std::fmt;

use super::{BoxedGen, Budget, DrawSource, Generator};
use crate::diagnostics::Abandoned;

/// Always the same value; makes no draws.
#[derive(Debug, Clone)]
pub struct Just<T>(pub T);

pub fn just<T: Clone + fmt::Debug + Send + Sync + 'static>(value: T) -> Just<T> {
    Just(value)
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Generator for Just<T> {
    type Value = T;

    fn draw(&self, _src: &mut DrawSource, _budget: &mut Budget) -> Result<T, Abandoned> {
        Ok(self.0.clone())
    }
}

/// Integers in `lo..=hi`, shrinking toward `lo`.
#[derive(Debug, Clone, Copy)]
pub struct IntRange {
    lo: i64,
    hi: i64,
}

pub fn int_range(lo: i64, hi: i64) -> IntRange {
    assert!(lo <= hi, "int_range: empty range {lo}..={hi}");
    IntRange { lo, hi }
}

impl Generator for IntRange {
    type Value = i64;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<i64, Abandoned> {
        budget.consume(1);
        src.draw_int(self.lo, self.hi)
    }
}

/// Integers in `-magnitude..=magnitude`, shrinking toward 0 by zigzag
/// encoding (0, -1, 1, -2, 2, ...).
#[derive(Debug, Clone, Copy)]
pub struct NearZero {
    magnitude: u64,
}

pub fn near_zero(magnitude: u64) -> NearZero {
    NearZero { magnitude: magnitude.min(i64::MAX as u64) }
}

impl Generator for NearZero {
    type Value = i64;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<i64, Abandoned> {
        budget.consume(1);
        let offset = src.draw_offset(self.magnitude.saturating_mul(2))?;
        let half = offset.div_ceil(2) as i64;
        Ok(if offset % 2 == 1 { -half } else { half })
    }
}

/// One of a fixed list of values; earlier values are simpler.
#[derive(Debug, Clone)]
pub struct Select<T> {
    items: Vec<T>,
}

pub fn select<T: Clone + fmt::Debug + Send + Sync + 'static>(items: Vec<T>) -> Select<T> {
    assert!(!items.is_empty(), "select needs at least one item");
    Select { items }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Generator for Select<T> {
    type Value = T;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<T, Abandoned> {
        budget.consume(1);
        if self.items.len() == 1 {
            return Ok(self.items[0].clone());
        }
        let i = src.draw_offset(self.items.len() as u64 - 1)? as usize;
        Ok(self.items[i].clone())
    }
}

/// Weighted choice between generators. The first alternative is the
/// fallback once the budget runs out, so list the simplest one first.
pub struct OneOf<T> {
    alternatives: Vec<(u32, BoxedGen<T>)>,
    weights: Vec<u32>,
}

pub fn one_of<T: Clone + fmt::Debug + Send + 'static>(
    alternatives: Vec<(u32, BoxedGen<T>)>,
) -> OneOf<T> {
    assert!(!alternatives.is_empty(), "one_of needs at least one alternative");
    assert!(alternatives.iter().all(|(w, _)| *w > 0), "one_of weights must be positive");
    let weights = alternatives.iter().map(|(w, _)| *w).collect();
    OneOf { alternatives, weights }
}

impl<T: Clone + fmt::Debug + Send + 'static> Generator for OneOf<T> {
    type Value = T;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<T, Abandoned> {
        let index = if budget.is_exhausted() || self.alternatives.len() == 1 {
            0
        } else {
            src.draw_weighted(&self.weights)?
        };
        self.alternatives[index].1.draw(src, budget)
    }
}

/// Vectors with a length in `min..=max`, limited by the remaining budget.
#[derive(Debug, Clone)]
pub struct VecOf<G> {
    element: G,
    min: usize,
    max: usize,
}

pub fn vec_of<G: Generator>(element: G, min: usize, max: usize) -> VecOf<G> {
    assert!(min <= max, "vec_of: min {min} exceeds max {max}");
    VecOf { element, min, max }
}

/// Draw a repeat count: extremes are favoured by the source's bias, and the
/// count never exceeds what the budget can pay for at `unit_cost` each.
pub(crate) fn draw_count(
    src: &mut DrawSource,
    budget: &Budget,
    min: usize,
    max: usize,
    unit_cost: usize,
) -> Result<usize, Abandoned> {
    let affordable = (budget.remaining() / unit_cost.max(1)).clamp(min, max);
    if affordable == min {
        return Ok(min);
    }
    Ok(min + src.draw_offset((affordable - min) as u64)? as usize)
}

impl<G: Generator> Generator for VecOf<G> {
    type Value = Vec<G::Value>;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Self::Value, Abandoned> {
        budget.consume(1);
        let count = draw_count(src, budget, self.min, self.max, 1)?;
        (0..count).map(|_| self.element.draw(src, budget)).collect()
    }
}

/// Strings whose characters come from `chars`.
#[derive(Debug, Clone)]
pub struct StringOf<G> {
    chars: VecOf<G>,
}

pub fn string_of<G: Generator<Value = char>>(chars: G, min: usize, max: usize) -> StringOf<G> {
    StringOf { chars: vec_of(chars, min, max) }
}

impl<G: Generator<Value = char>> Generator for StringOf<G> {
    type Value = String;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<String, Abandoned> {
        Ok(self.chars.draw(src, budget)?.into_iter().collect())
    }
}

/// Byte strings, shrinking toward shorter and toward zero bytes.
#[derive(Debug, Clone, Copy)]
pub struct Bytes {
    min: usize,
    max: usize,
}

pub fn bytes(min: usize, max: usize) -> Bytes {
    assert!(min <= max, "bytes: min {min} exceeds max {max}");
    Bytes { min, max }
}

impl Generator for Bytes {
    type Value = Vec<u8>;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Vec<u8>, Abandoned> {
        budget.consume(1);
        let count = draw_count(src, budget, self.min, self.max, 1)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            budget.consume(1);
            out.push(src.draw_offset(255)? as u8);
        }
        Ok(out)
    }
}

#[derive(Clone)]
pub struct Map<G, F> {
    pub(super) inner: G,
    pub(super) f: F,
}

impl<G, F, U> Generator for Map<G, F>
where
    G: Generator,
    F: Fn(G::Value) -> U + Send + Sync,
    U: Clone + fmt::Debug + Send + 'static,
{
    type Value = U;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<U, Abandoned> {
        self.inner.draw(src, budget).map(&self.f)
    }
}

macro_rules! tuple_generator {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Generator),+> Generator for ($($name,)+) {
            type Value = ($($name::Value,)+);

            fn draw(
                &self,
                src: &mut DrawSource,
                budget: &mut Budget,
            ) -> Result<Self::Value, Abandoned> {
                budget.consume(1);
                Ok(($(self.$idx.draw(src, budget)?,)+))
            }
        }
    };
}

tuple_generator!(A.0, B.1);
tuple_generator!(A.0, B.1, C.2);
tuple_generator!(A.0, B.1, C.2, D.3);

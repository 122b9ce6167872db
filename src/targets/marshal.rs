//! Binary serialization of nested, heterogeneous values through `bincode`.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Abandoned, RegistryError};
use crate::generator::combinators::draw_count;
use crate::generator::{Budget, DrawSource, Generator};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::property::Property;
use crate::registry::Registry;

pub const VALUE_TAG: &str = "marshal.value";

/// A value of the kind a marshalling format has to carry: scalars of every
/// width, text and bytes, and containers nested to any depth. Floats are
/// never NaN so that equality is reflexive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Marshal {
    None,
    Bool(bool),
    Int(i64),
    BigInt(i128),
    Float(f64),
    Complex(f64, f64),
    Bytes(Vec<u8>),
    Text(String),
    Tuple(Vec<Marshal>),
    List(Vec<Marshal>),
    Dict(Vec<(Marshal, Marshal)>),
}

const TEXT_CHARS: &[char] = &['a', ' ', '\0', 'ß', 'Ω', '中', '\u{fffd}', '🦀'];

const FLOATS: &[f64] =
    &[0.0, -0.0, 1.5, f64::INFINITY, f64::NEG_INFINITY, f64::MAX, f64::MIN_POSITIVE, 5e-324];

#[derive(Debug, Clone, Copy)]
pub struct MarshalValues {
    max_items: usize,
}

pub fn marshal_values(max_items: usize) -> MarshalValues {
    MarshalValues { max_items }
}

impl MarshalValues {
    fn float(src: &mut DrawSource) -> Result<f64, Abandoned> {
        if src.draw_bool()? {
            let f = f64::from_bits(src.draw_offset(u64::MAX)?);
            return Ok(if f.is_nan() { 0.0 } else { f });
        }
        Ok(FLOATS[src.draw_offset(FLOATS.len() as u64 - 1)? as usize])
    }

    /// Hashable values only: scalars and tuples of them.
    fn key(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Marshal, Abandoned> {
        budget.consume(1);
        if budget.is_exhausted() {
            return Ok(Marshal::None);
        }
        match src.draw_weighted(&[1, 3, 3, 1])? {
            0 => Ok(Marshal::None),
            1 => Ok(Marshal::Int(src.draw_int(i64::MIN, i64::MAX)?)),
            2 => self.text(src, budget).map(Marshal::Text),
            _ => {
                let count = draw_count(src, budget, 0, self.max_items, 2)?;
                let items = (0..count).map(|_| self.key(src, budget)).collect::<Result<_, _>>()?;
                Ok(Marshal::Tuple(items))
            }
        }
    }

    fn text(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<String, Abandoned> {
        let len = draw_count(src, budget, 0, 16, 1)?;
        let mut s = String::with_capacity(len);
        for _ in 0..len {
            budget.consume(1);
            s.push(TEXT_CHARS[src.draw_offset(TEXT_CHARS.len() as u64 - 1)? as usize]);
        }
        Ok(s)
    }

    fn items(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Vec<Marshal>, Abandoned> {
        let count = draw_count(src, budget, 0, self.max_items, 2)?;
        (0..count).map(|_| self.draw(src, budget)).collect()
    }
}

impl Generator for MarshalValues {
    type Value = Marshal;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Marshal, Abandoned> {
        budget.consume(1);
        if budget.is_exhausted() {
            return Ok(Marshal::None);
        }
        let value = match src.draw_weighted(&[1, 1, 2, 1, 2, 1, 2, 2, 2, 2, 2])? {
            0 => Marshal::None,
            1 => Marshal::Bool(src.draw_bool()?),
            2 => Marshal::Int(src.draw_int(i64::MIN, i64::MAX)?),
            3 => {
                let hi = src.draw_int(i64::MIN, i64::MAX)?;
                let lo = src.draw_offset(u64::MAX)?;
                Marshal::BigInt((i128::from(hi) << 64) | i128::from(lo))
            }
            4 => Marshal::Float(Self::float(src)?),
            5 => Marshal::Complex(Self::float(src)?, Self::float(src)?),
            6 => {
                let len = draw_count(src, budget, 0, 24, 1)?;
                let mut bytes = Vec::with_capacity(len);
                for _ in 0..len {
                    budget.consume(1);
                    bytes.push(src.draw_offset(255)? as u8);
                }
                Marshal::Bytes(bytes)
            }
            7 => Marshal::Text(self.text(src, budget)?),
            8 => Marshal::Tuple(self.items(src, budget)?),
            9 => Marshal::List(self.items(src, budget)?),
            _ => {
                let count = draw_count(src, budget, 0, self.max_items, 3)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = self.key(src, budget)?;
                    if entries.iter().any(|(k, _)| *k == key) {
                        continue;
                    }
                    entries.push((key, self.draw(src, budget)?));
                }
                Marshal::Dict(entries)
            }
        };
        Ok(value)
    }
}

pub fn dumps(value: &Marshal) -> TargetResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(TargetError::failed)
}

pub fn loads(data: &[u8]) -> TargetResult<Marshal> {
    let (value, read) = bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map_err(TargetError::failed)?;
    if read != data.len() {
        return Err(TargetError::failed(format!("{} trailing bytes", data.len() - read)));
    }
    Ok(value)
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(VALUE_TAG, marshal_values(5).boxed())?;
    let value = registry.generators.get::<Marshal>(VALUE_TAG)?;

    registry.properties.register(Property::new(
        "marshal.bincode_round_trip",
        "loads(dumps(v)) == v for nested scalars, text, bytes and containers",
        value,
        Oracle::round_trip(|v: &Marshal| dumps(v), |bytes: &Vec<u8>| loads(bytes)),
    ))?;

    Ok(())
}

//! JSON encoding contracts over finite `serde_json::Value`s.

use serde_json::{Map, Number, Value};

use crate::diagnostics::{Abandoned, RegistryError};
use crate::generator::combinators::draw_count;
use crate::generator::{Budget, DrawSource, Generator, select};
use crate::oracle::{Oracle, TargetError, TargetResult};
use crate::property::Property;
use crate::registry::Registry;

pub const VALUE_TAG: &str = "json.value";

/// Characters that exercise the string escaper.
const CHARS: &[char] = &[
    'a', 'Z', '0', ' ', '"', '\\', '/', '\n', '\t', '\u{0}', '\u{1f}', 'é', '\u{2028}', '😀',
];

const FLOATS: &[f64] =
    &[0.0, -0.0, 0.5, 1e-7, 1e21, f64::MIN_POSITIVE, f64::MAX, f64::EPSILON, 5e-324, 0.1];

/// Finite JSON documents. Scalars are cheap; arrays and objects pay one
/// budget unit per level so deep nesting stops once the budget runs out.
#[derive(Debug, Clone, Copy)]
pub struct JsonValues {
    max_items: usize,
}

pub fn json_values(max_items: usize) -> JsonValues {
    JsonValues { max_items }
}

impl JsonValues {
    fn string(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<String, Abandoned> {
        let len = draw_count(src, budget, 0, 12, 1)?;
        let mut s = String::with_capacity(len);
        for _ in 0..len {
            budget.consume(1);
            s.push(CHARS[src.draw_offset(CHARS.len() as u64 - 1)? as usize]);
        }
        Ok(s)
    }

    fn number(&self, src: &mut DrawSource) -> Result<Number, Abandoned> {
        let n = match src.draw_offset(2)? {
            0 => Number::from(src.draw_int(i64::MIN, i64::MAX)?),
            1 => {
                let f = FLOATS[src.draw_offset(FLOATS.len() as u64 - 1)? as usize];
                Number::from_f64(f).unwrap_or_else(|| 0.into())
            }
            _ => {
                let f = f64::from_bits(src.draw_offset(u64::MAX)?);
                Number::from_f64(f).unwrap_or_else(|| 0.into())
            }
        };
        Ok(n)
    }
}

impl Generator for JsonValues {
    type Value = Value;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Value, Abandoned> {
        budget.consume(1);
        let kind = if budget.is_exhausted() { 0 } else { src.draw_weighted(&[1, 1, 3, 3, 2, 2])? };
        let value = match kind {
            0 => Value::Null,
            1 => Value::Bool(src.draw_bool()?),
            2 => Value::Number(self.number(src)?),
            3 => Value::String(self.string(src, budget)?),
            4 => {
                let count = draw_count(src, budget, 0, self.max_items, 2)?;
                Value::Array((0..count).map(|_| self.draw(src, budget)).collect::<Result<_, _>>()?)
            }
            _ => {
                let count = draw_count(src, budget, 0, self.max_items, 3)?;
                let mut map = Map::new();
                for _ in 0..count {
                    let key = self.string(src, budget)?;
                    map.insert(key, self.draw(src, budget)?);
                }
                Value::Object(map)
            }
        };
        Ok(value)
    }
}

fn dumps(pretty: bool, value: &Value) -> TargetResult<String> {
    let text =
        if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    text.map_err(TargetError::failed)
}

fn loads(text: &str) -> TargetResult<Value> {
    serde_json::from_str(text).map_err(TargetError::failed)
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.generators.register(VALUE_TAG, json_values(5).boxed())?;
    let value = registry.generators.get::<Value>(VALUE_TAG)?;

    registry.properties.register(Property::new(
        "json.round_trip",
        "loads(dumps(v)) == v, compact or pretty",
        (select(vec![false, true]), value.clone()),
        Oracle::round_trip(
            |(pretty, v): &(bool, Value)| Ok((*pretty, dumps(*pretty, v)?)),
            |(pretty, text): &(bool, String)| Ok((*pretty, loads(text)?)),
        ),
    ))?;

    registry.properties.register(Property::new(
        "json.dumps_stable",
        "dumps(loads(dumps(v))) == dumps(v)",
        (select(vec![false, true]), value),
        Oracle::metamorphic(
            "dumps then loads",
            |(pretty, v): &(bool, Value)| Ok((*pretty, loads(&dumps(*pretty, v)?)?)),
            |(pretty, v): &(bool, Value)| dumps(*pretty, v),
            |a, b| a == b,
        ),
    ))?;

    Ok(())
}

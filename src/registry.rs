//! Explicit registration of generators (by tag) and properties (by id).

use std::any::{Any, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::diagnostics::RegistryError;
use crate::generator::BoxedGen;
use crate::property::Checkable;

struct GeneratorEntry {
    generator: Box<dyn Any + Send + Sync>,
    value_type: &'static str,
}

/// Named generators. Lookup is typed: asking for a tag with the wrong value
/// type is an error rather than a panic.
#[derive(Default)]
pub struct GeneratorRegistry {
    entries: BTreeMap<String, GeneratorEntry>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<V>(
        &mut self,
        tag: impl Into<String>,
        generator: BoxedGen<V>,
    ) -> Result<(), RegistryError>
    where
        V: Clone + fmt::Debug + Send + 'static,
    {
        let tag = tag.into();
        if self.entries.contains_key(&tag) {
            return Err(RegistryError::DuplicateGenerator(tag));
        }
        let entry = GeneratorEntry { generator: Box::new(generator), value_type: type_name::<V>() };
        self.entries.insert(tag, entry);
        Ok(())
    }

    pub fn get<V>(&self, tag: &str) -> Result<BoxedGen<V>, RegistryError>
    where
        V: Clone + fmt::Debug + Send + 'static,
    {
        let entry = self
            .entries
            .get(tag)
            .ok_or_else(|| RegistryError::UnknownGenerator(tag.to_string()))?;
        entry.generator.downcast_ref::<BoxedGen<V>>().cloned().ok_or_else(|| {
            RegistryError::TypeMismatch { tag: tag.to_string(), expected: type_name::<V>() }
        })
    }

    /// Tags with the type of value each generator produces, sorted by tag.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.entries.iter().map(|(tag, e)| (tag.as_str(), e.value_type))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Properties in registration order.
#[derive(Default)]
pub struct PropertyRegistry {
    properties: Vec<Box<dyn Checkable>>,
    index: HashMap<String, usize>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, property: impl Checkable + 'static) -> Result<(), RegistryError> {
        let id = property.id().to_string();
        if self.index.contains_key(&id) {
            return Err(RegistryError::DuplicateProperty(id));
        }
        self.index.insert(id, self.properties.len());
        self.properties.push(Box::new(property));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Checkable> {
        self.index.get(id).map(|&i| self.properties[i].as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Checkable> {
        self.properties.iter().map(|p| p.as_ref())
    }

    /// Properties whose id contains `filter`; all of them when `filter` is
    /// `None`.
    pub fn matching<'a>(
        &'a self,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = &'a dyn Checkable> {
        self.iter().filter(move |p| filter.is_none_or(|f| p.id().contains(f)))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Both registries together; built-in targets register into this.
#[derive(Default)]
pub struct Registry {
    pub generators: GeneratorRegistry,
    pub properties: PropertyRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in generator and property.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::targets::register_all(&mut registry)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Generator, int_range, just};
    use crate::oracle::Oracle;
    use crate::property::Property;

    #[test]
    fn typed_lookup() {
        let mut generators = GeneratorRegistry::new();
        generators.register("small", int_range(0, 9).boxed()).unwrap();
        assert!(generators.get::<i64>("small").is_ok());
        assert!(matches!(
            generators.get::<String>("small"),
            Err(RegistryError::TypeMismatch { .. })
        ));
        assert!(matches!(generators.get::<i64>("large"), Err(RegistryError::UnknownGenerator(_))));
        assert!(matches!(
            generators.register("small", just(1i64).boxed()),
            Err(RegistryError::DuplicateGenerator(_))
        ));
        assert_eq!(generators.tags().collect::<Vec<_>>(), vec![("small", "i64")]);
    }

    #[test]
    fn properties_by_id_and_filter() {
        let identity = || Oracle::round_trip(|x: &i64| Ok(*x), |e: &i64| Ok(*e));
        let mut properties = PropertyRegistry::new();
        properties.register(Property::new("codec.a", "", int_range(0, 1), identity())).unwrap();
        properties.register(Property::new("time.b", "", int_range(0, 1), identity())).unwrap();
        assert!(matches!(
            properties.register(Property::new("codec.a", "", int_range(0, 1), identity())),
            Err(RegistryError::DuplicateProperty(_))
        ));
        assert_eq!(properties.get("time.b").map(|p| p.id()), Some("time.b"));
        let ids: Vec<&str> = properties.matching(Some("codec")).map(|p| p.id()).collect();
        assert_eq!(ids, vec!["codec.a"]);
        assert_eq!(properties.matching(None).count(), 2);
    }
}

//! Per-field converters

use std::sync::Arc;

use ahash::AHashMap;

use super::Mapper;
use crate::converter::Converter;
use crate::types::{TypeKey, TypeRegistry};

/// Fixes the converter of individual fields, overriding the lookup for them.
///
/// A converter registered for a field of `owner` also applies to that field
/// in every subtype of `owner`.
pub struct LocalConversionMapper {
    inner: Box<dyn Mapper>,
    converters: AHashMap<(TypeKey, String), Arc<dyn Converter>>,
}

impl LocalConversionMapper {
    /// Wrap `inner` without local converters.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            converters: AHashMap::new(),
        }
    }

    /// Convert field `field` of `owner` with `converter`.
    pub fn add_local_converter(&mut self, owner: TypeKey, field: impl Into<String>, converter: Arc<dyn Converter>) {
        self.converters.insert((owner, field.into()), converter);
    }
}

impl Mapper for LocalConversionMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn local_converter(&self, owner: TypeKey, field: &str) -> Option<Arc<dyn Converter>> {
        if !self.converters.is_empty() {
            for ty in self.registry().ancestors(owner) {
                if let Some(converter) = self.converters.get(&(ty, field.to_string())) {
                    return Some(converter.clone());
                }
            }
        }
        self.inner.local_converter(owner, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ReflectionConverter;
    use crate::mapper::DefaultMapper;
    use crate::types::TypeDef;

    #[test]
    fn test_local_converter_applies_to_subtypes() {
        let registry = Arc::new(
            TypeRegistry::builder()
                .register(TypeDef::structure("z.Point").field("x", "trellis.Int"))
                .register(TypeDef::structure("z.Shape").field("origin", "z.Point"))
                .register(TypeDef::structure("z.Circle").extends("z.Shape"))
                .build()
                .unwrap(),
        );
        let shape = registry.lookup("z.Shape").unwrap();
        let circle = registry.lookup("z.Circle").unwrap();
        let point = registry.lookup("z.Point").unwrap();
        let mut mapper = LocalConversionMapper::new(Box::new(DefaultMapper::new(registry)));
        mapper.add_local_converter(shape, "origin", Arc::new(ReflectionConverter));

        assert!(mapper.local_converter(shape, "origin").is_some());
        assert!(mapper.local_converter(circle, "origin").is_some());
        assert!(mapper.local_converter(point, "origin").is_none());
        assert!(mapper.local_converter(shape, "other").is_none());
    }
}

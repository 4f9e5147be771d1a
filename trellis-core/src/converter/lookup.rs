//! Converter registration and dispatch

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::trace;

use super::{Converter, PrioritizedList};
use crate::error::{ErrorKind, Result};
use crate::types::{TypeKey, TypeRegistry};

/// Registered converters with a per-type dispatch cache.
///
/// Lookup scans the converters in priority order and remembers the answer
/// for the type. Registering a converter drops the cache.
#[derive(Default)]
pub struct ConverterLookup {
    converters: PrioritizedList<Arc<dyn Converter>>,
    cache: RwLock<AHashMap<TypeKey, Arc<dyn Converter>>>,
}

impl fmt::Debug for ConverterLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<(i32, &str)> = self
            .converters
            .iter_with_priority()
            .map(|(priority, converter)| (priority, converter.name()))
            .collect();
        f.debug_struct("ConverterLookup")
            .field("converters", &names)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ConverterLookup {
    /// Lookup without converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` at `priority`.
    pub fn register(&mut self, converter: Arc<dyn Converter>, priority: i32) {
        self.converters.add(converter, priority);
        self.cache.get_mut().clear();
    }

    /// Converter for values of `ty`.
    pub fn lookup(&self, ty: TypeKey, registry: &TypeRegistry) -> Result<Arc<dyn Converter>> {
        if let Some(converter) = self.cache.read().get(&ty) {
            return Ok(converter.clone());
        }

        trace!(type_name = registry.name(ty), "converter cache miss");
        let converter = self
            .converters
            .iter()
            .find(|converter| converter.can_convert(ty, registry))
            .cloned()
            .ok_or_else(|| ErrorKind::NoConverter {
                type_name: registry.name(ty).to_string(),
            })?;
        self.cache.write().insert(ty, converter.clone());
        Ok(converter)
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Whether no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MarshallingContext, UnmarshallingContext};
    use crate::types::TypeDef;
    use crate::value::Value;

    struct Named(&'static str, TypeKey);

    impl Converter for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn can_convert(&self, ty: TypeKey, _registry: &TypeRegistry) -> bool {
            ty == self.1 || self.1 == TypeKey::OBJECT
        }

        fn marshal(&self, _value: &Value, _ctx: &mut MarshallingContext<'_>) -> Result<()> {
            Ok(())
        }

        fn unmarshal(&self, _ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_priority_and_newest_wins() {
        let registry = TypeRegistry::builder().build().unwrap();
        let mut lookup = ConverterLookup::new();
        lookup.register(Arc::new(Named("catch-all", TypeKey::OBJECT)), -20);
        lookup.register(Arc::new(Named("first", TypeKey::STRING)), 0);
        assert_eq!(lookup.lookup(TypeKey::STRING, &registry).unwrap().name(), "first");
        assert_eq!(lookup.lookup(TypeKey::INT, &registry).unwrap().name(), "catch-all");

        lookup.register(Arc::new(Named("second", TypeKey::STRING)), 0);
        assert_eq!(lookup.lookup(TypeKey::STRING, &registry).unwrap().name(), "second");

        lookup.register(Arc::new(Named("older-but-higher", TypeKey::STRING)), 5);
        lookup.register(Arc::new(Named("newer-but-lower", TypeKey::STRING)), 1);
        assert_eq!(
            lookup.lookup(TypeKey::STRING, &registry).unwrap().name(),
            "older-but-higher"
        );
    }

    #[test]
    fn test_no_converter() {
        let registry = TypeRegistry::builder()
            .register(TypeDef::structure("t.Thing"))
            .build()
            .unwrap();
        let mut lookup = ConverterLookup::new();
        lookup.register(Arc::new(Named("strings", TypeKey::STRING)), 0);
        let error = lookup
            .lookup(registry.lookup("t.Thing").unwrap(), &registry)
            .err()
            .unwrap();
        assert!(matches!(error.kind(), ErrorKind::NoConverter { type_name } if type_name == "t.Thing"));
    }
}

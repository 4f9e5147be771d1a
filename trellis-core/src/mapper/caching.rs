//! Memoizing outer layer

use std::borrow::Cow;

use ahash::AHashMap;
use parking_lot::RwLock;

use super::Mapper;
use crate::error::Result;
use crate::types::{TypeKey, TypeRegistry};

/// Memoizes type resolution and type naming of the chain it wraps.
///
/// Only successful resolutions are cached, so a failure is recomputed (and
/// re-reported) every time.
pub struct CachingMapper {
    inner: Box<dyn Mapper>,
    real_classes: RwLock<AHashMap<String, TypeKey>>,
    serialized_classes: RwLock<AHashMap<TypeKey, String>>,
}

impl CachingMapper {
    /// Wrap `inner` with empty caches.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            real_classes: RwLock::new(AHashMap::new()),
            serialized_classes: RwLock::new(AHashMap::new()),
        }
    }
}

impl Mapper for CachingMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn real_class(&self, name: &str) -> Result<TypeKey> {
        if let Some(ty) = self.real_classes.read().get(name) {
            return Ok(*ty);
        }
        let ty = self.inner.real_class(name)?;
        self.real_classes.write().insert(name.to_string(), ty);
        Ok(ty)
    }

    fn serialized_class(&self, ty: TypeKey) -> Cow<'_, str> {
        if let Some(name) = self.serialized_classes.read().get(&ty) {
            return Cow::Owned(name.clone());
        }
        let name = self.inner.serialized_class(ty).into_owned();
        self.serialized_classes.write().insert(ty, name.clone());
        Cow::Owned(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{ClassAliasingMapper, DefaultMapper};
    use crate::types::TypeDef;
    use std::sync::Arc;

    #[test]
    fn test_cached_answers_match_inner() {
        let registry = Arc::new(
            TypeRegistry::builder()
                .register(TypeDef::structure("a.Thing"))
                .build()
                .unwrap(),
        );
        let thing = registry.lookup("a.Thing").unwrap();
        let mut aliasing = ClassAliasingMapper::new(Box::new(DefaultMapper::new(registry)));
        aliasing.add_class_alias("thing", thing);
        let mapper = CachingMapper::new(Box::new(aliasing));

        for _ in 0..2 {
            assert_eq!(mapper.real_class("thing").unwrap(), thing);
            assert_eq!(mapper.serialized_class(thing), "thing");
            assert!(mapper.real_class("missing").is_err());
        }
        assert_eq!(mapper.real_classes.read().len(), 1);
    }
}

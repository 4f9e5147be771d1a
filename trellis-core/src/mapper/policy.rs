//! Placement and instantiation policy layers

use ahash::{AHashMap, AHashSet};

use super::{ImplicitCollection, Mapper};
use crate::types::{TypeKey, TypeKind, TypeRegistry};

/// Marks stream elements that may be skipped when they match no field.
pub struct ElementIgnoringMapper {
    inner: Box<dyn Mapper>,
    ignore_unknown: bool,
    ignored: AHashSet<String>,
}

impl ElementIgnoringMapper {
    /// Wrap `inner`, ignoring nothing.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            ignore_unknown: false,
            ignored: AHashSet::new(),
        }
    }

    /// Skip every element that matches no field.
    pub fn ignore_unknown_elements(&mut self, ignore: bool) {
        self.ignore_unknown = ignore;
    }

    /// Skip unmatched elements named `name`.
    pub fn ignore_element(&mut self, name: impl Into<String>) {
        self.ignored.insert(name.into());
    }
}

impl Mapper for ElementIgnoringMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn is_ignored_element(&self, name: &str) -> bool {
        self.ignore_unknown || self.ignored.contains(name) || self.inner.is_ignored_element(name)
    }
}

/// Collection fields written as bare sibling items.
pub struct ImplicitCollectionMapper {
    inner: Box<dyn Mapper>,
    collections: Vec<ImplicitCollection>,
}

impl ImplicitCollectionMapper {
    /// Wrap `inner` without implicit collections.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            collections: Vec::new(),
        }
    }

    /// Declare an implicit collection. A later declaration for the same field replaces the earlier one.
    pub fn add(&mut self, collection: ImplicitCollection) {
        self.collections
            .retain(|existing| !(existing.owner == collection.owner && existing.field == collection.field));
        self.collections.push(collection);
    }

    fn declared_for(&self, owner: TypeKey) -> impl Iterator<Item = &ImplicitCollection> + '_ {
        let ancestors: Vec<TypeKey> = self.registry().ancestors(owner).collect();
        ancestors.into_iter().flat_map(move |ty| {
            self.collections.iter().filter(move |collection| collection.owner == ty)
        })
    }
}

impl Mapper for ImplicitCollectionMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn implicit_collection_for_field(&self, owner: TypeKey, field: &str) -> Option<&ImplicitCollection> {
        self.declared_for(owner)
            .find(|collection| collection.field == field)
            .or_else(|| self.inner.implicit_collection_for_field(owner, field))
    }

    fn field_name_for_item(&self, owner: TypeKey, item_type: TypeKey, item_name: Option<&str>) -> Option<&str> {
        let registry = self.registry();
        let found = self.declared_for(owner).find(|collection| match item_name {
            Some(name) => collection.item_name.as_deref() == Some(name),
            None => {
                collection.item_name.is_none()
                    && (item_type == TypeKey::NULL
                        || registry.is_assignable(item_type, collection.item_type.unwrap_or(TypeKey::OBJECT)))
            }
        });
        match found {
            Some(collection) => Some(collection.field.as_str()),
            None => self.inner.field_name_for_item(owner, item_type, item_name),
        }
    }

    fn item_type_for_item_name(&self, owner: TypeKey, item_name: &str) -> Option<TypeKey> {
        self.declared_for(owner)
            .find(|collection| collection.item_name.as_deref() == Some(item_name))
            .map(|collection| collection.item_type.unwrap_or(TypeKey::OBJECT))
            .or_else(|| self.inner.item_type_for_item_name(owner, item_name))
    }
}

/// Concrete types instantiated for abstract declarations.
pub struct DefaultImplementationsMapper {
    inner: Box<dyn Mapper>,
    implementations: AHashMap<TypeKey, TypeKey>,
}

impl DefaultImplementationsMapper {
    /// Wrap `inner` without defaults.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            implementations: AHashMap::new(),
        }
    }

    /// Instantiate `implementation` wherever `declared` appears without a type marker.
    pub fn add_default_implementation(&mut self, declared: TypeKey, implementation: TypeKey) {
        self.implementations.insert(declared, implementation);
    }
}

impl Mapper for DefaultImplementationsMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn default_implementation_of(&self, ty: TypeKey) -> TypeKey {
        match self.implementations.get(&ty) {
            Some(implementation) => *implementation,
            None => self.inner.default_implementation_of(ty),
        }
    }
}

/// Fields and field types placed in attributes.
pub struct AttributeMapper {
    inner: Box<dyn Mapper>,
    fields: AHashMap<TypeKey, AHashSet<String>>,
    types: AHashSet<TypeKey>,
}

impl AttributeMapper {
    /// Wrap `inner` with no attribute fields.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            fields: AHashMap::new(),
            types: AHashSet::new(),
        }
    }

    /// Place field `field` of `owner` (and its subtypes) in an attribute.
    pub fn add_attribute_field(&mut self, owner: TypeKey, field: impl Into<String>) {
        self.fields.entry(owner).or_default().insert(field.into());
    }

    /// Place every field declared as `ty` in an attribute.
    pub fn add_attribute_type(&mut self, ty: TypeKey) {
        self.types.insert(ty);
    }
}

impl Mapper for AttributeMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn use_attribute_for(&self, owner: TypeKey, field: &str, field_type: TypeKey) -> bool {
        self.types.contains(&field_type)
            || self
                .registry()
                .ancestors(owner)
                .any(|ty| self.fields.get(&ty).is_some_and(|fields| fields.contains(field)))
            || self.inner.use_attribute_for(owner, field, field_type)
    }
}

/// Enum variants are values: written in full at every occurrence.
pub struct EnumMapper {
    inner: Box<dyn Mapper>,
}

impl EnumMapper {
    /// Wrap `inner`.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self { inner }
    }
}

impl Mapper for EnumMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn is_immutable_value_type(&self, ty: TypeKey) -> bool {
        matches!(self.registry().get(ty).kind(), TypeKind::Enum { .. }) || self.inner.is_immutable_value_type(ty)
    }
}

/// Object types whose instances never take part in reference tracking.
pub struct ImmutableTypesMapper {
    inner: Box<dyn Mapper>,
    types: AHashSet<TypeKey>,
}

impl ImmutableTypesMapper {
    /// Wrap `inner` without extra immutable types.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            types: AHashSet::new(),
        }
    }

    /// Treat instances of `ty` as values.
    pub fn add_immutable_type(&mut self, ty: TypeKey) {
        self.types.insert(ty);
    }
}

impl Mapper for ImmutableTypesMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn is_immutable_value_type(&self, ty: TypeKey) -> bool {
        self.types.contains(&ty) || self.inner.is_immutable_value_type(ty)
    }
}

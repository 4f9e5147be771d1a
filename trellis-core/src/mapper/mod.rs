//! Mapper chain
//!
//! A mapper answers naming and placement questions: which name a type or
//! field is written under, which type a name stands for, whether a field
//! becomes an attribute, which implementation an abstract declaration gets.
//! Mappers are layered. Each layer overrides the queries it has a policy for
//! and forwards everything else to the layer it wraps; the innermost layer
//! ([`DefaultMapper`]) has no inner mapper and answers from the
//! [`TypeRegistry`] alone. The outermost layer's answer is final.
//!
//! A chain is assembled once by [`MapperChainBuilder`] and is read-only
//! afterwards, so it can be shared by any number of concurrent conversions.

use std::borrow::Cow;
use std::sync::Arc;

use crate::converter::Converter;
use crate::error::{ErrorKind, Result};
use crate::types::{TypeKey, TypeKind, TypeRegistry};

mod aliasing;
mod caching;
mod chain;
mod default;
mod local;
mod policy;
mod security;

pub use aliasing::{ClassAliasingMapper, FieldAliasingMapper, PackageAliasingMapper, SystemAttributeAliasingMapper};
pub use caching::CachingMapper;
pub use chain::{MapperChainBuilder, MapperLayer};
pub use default::DefaultMapper;
pub use local::LocalConversionMapper;
pub use policy::{
    AttributeMapper, DefaultImplementationsMapper, ElementIgnoringMapper, EnumMapper, ImmutableTypesMapper,
    ImplicitCollectionMapper,
};
pub use security::SecurityMapper;

/// Attributes the engine writes for its own bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemAttribute {
    /// Runtime type of a value differing from its declared default
    Class,
    /// Back-reference marker
    Reference,
    /// Identity of an object in id reference mode
    Id,
    /// Declaring type of a shadowed field
    DefinedIn,
}

impl SystemAttribute {
    /// Every system attribute.
    pub const ALL: [SystemAttribute; 4] = [
        SystemAttribute::Class,
        SystemAttribute::Reference,
        SystemAttribute::Id,
        SystemAttribute::DefinedIn,
    ];

    /// Attribute name used unless aliased.
    pub fn default_name(self) -> &'static str {
        match self {
            SystemAttribute::Class => "class",
            SystemAttribute::Reference => "reference",
            SystemAttribute::Id => "id",
            SystemAttribute::DefinedIn => "defined-in",
        }
    }
}

/// Collection field written as repeated sibling items without a wrapper node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitCollection {
    /// Type declaring the field
    pub owner: TypeKey,
    /// List-typed field holding the items
    pub field: String,
    /// Declared item type; any type when absent
    pub item_type: Option<TypeKey>,
    /// Node name for every item; items are named after their type when absent
    pub item_name: Option<String>,
}

/// Naming and placement policy layer.
///
/// Implementors provide [`wrapped`](Mapper::wrapped) and
/// [`registry`](Mapper::registry) and override only the queries they have a
/// policy for.
pub trait Mapper: Send + Sync {
    /// The next inner layer, `None` for the base layer.
    fn wrapped(&self) -> Option<&dyn Mapper>;

    /// Registry the chain was built against.
    fn registry(&self) -> &TypeRegistry;

    /// Name a type is written under.
    fn serialized_class(&self, ty: TypeKey) -> Cow<'_, str> {
        match self.wrapped() {
            Some(inner) => inner.serialized_class(ty),
            None => Cow::Borrowed(self.registry().name(ty)),
        }
    }

    /// Type a serialized name stands for.
    fn real_class(&self, name: &str) -> Result<TypeKey> {
        match self.wrapped() {
            Some(inner) => inner.real_class(name),
            None => self.registry().lookup(name).ok_or_else(|| {
                ErrorKind::ClassResolution {
                    name: name.to_string(),
                }
                .into()
            }),
        }
    }

    /// Name field `field` of `owner` is written under.
    fn serialized_member<'a>(&'a self, owner: TypeKey, field: &'a str) -> Cow<'a, str> {
        match self.wrapped() {
            Some(inner) => inner.serialized_member(owner, field),
            None => Cow::Borrowed(field),
        }
    }

    /// Field of `owner` a serialized member name stands for.
    fn real_member<'a>(&'a self, owner: TypeKey, serialized: &'a str) -> Cow<'a, str> {
        match self.wrapped() {
            Some(inner) => inner.real_member(owner, serialized),
            None => Cow::Borrowed(serialized),
        }
    }

    /// Whether field `field` of `owner` is written and read at all.
    fn should_serialize_member(&self, owner: TypeKey, field: &str) -> bool {
        self.wrapped()
            .map_or(true, |inner| inner.should_serialize_member(owner, field))
    }

    /// Whether an element matching no field may be skipped on read.
    fn is_ignored_element(&self, name: &str) -> bool {
        self.wrapped().is_some_and(|inner| inner.is_ignored_element(name))
    }

    /// Whether field `field` of `owner` is placed in an attribute.
    fn use_attribute_for(&self, owner: TypeKey, field: &str, field_type: TypeKey) -> bool {
        self.wrapped()
            .is_some_and(|inner| inner.use_attribute_for(owner, field, field_type))
    }

    /// Type instantiated for a declaration of `ty` when no type marker is present.
    fn default_implementation_of(&self, ty: TypeKey) -> TypeKey {
        self.wrapped()
            .map_or(ty, |inner| inner.default_implementation_of(ty))
    }

    /// Whether instances of `ty` are written in full at every occurrence and
    /// never take part in reference tracking.
    fn is_immutable_value_type(&self, ty: TypeKey) -> bool {
        match self.wrapped() {
            Some(inner) => inner.is_immutable_value_type(ty),
            None => matches!(self.registry().get(ty).kind(), TypeKind::Null | TypeKind::Primitive(_)),
        }
    }

    /// Implicit collection declared for field `field` of `owner` or an ancestor.
    fn implicit_collection_for_field(&self, owner: TypeKey, field: &str) -> Option<&ImplicitCollection> {
        self.wrapped()
            .and_then(|inner| inner.implicit_collection_for_field(owner, field))
    }

    /// Implicit collection field of `owner` accepting an item of `item_type`
    /// found under `item_name` (or under its type name when `None`).
    fn field_name_for_item(&self, owner: TypeKey, item_type: TypeKey, item_name: Option<&str>) -> Option<&str> {
        self.wrapped()
            .and_then(|inner| inner.field_name_for_item(owner, item_type, item_name))
    }

    /// Declared item type of the implicit collection of `owner` whose items
    /// are named `item_name`.
    fn item_type_for_item_name(&self, owner: TypeKey, item_name: &str) -> Option<TypeKey> {
        self.wrapped()
            .and_then(|inner| inner.item_type_for_item_name(owner, item_name))
    }

    /// Converter fixed for field `field` of `owner` or an ancestor,
    /// bypassing the converter lookup.
    fn local_converter(&self, owner: TypeKey, field: &str) -> Option<Arc<dyn Converter>> {
        self.wrapped().and_then(|inner| inner.local_converter(owner, field))
    }

    /// Name of a system attribute, `None` when it is disabled.
    fn alias_for_system_attribute(&self, attribute: SystemAttribute) -> Option<Cow<'_, str>> {
        match self.wrapped() {
            Some(inner) => inner.alias_for_system_attribute(attribute),
            None => Some(Cow::Borrowed(attribute.default_name())),
        }
    }

    /// System attribute written under `alias`, as seen from this layer outward.
    fn system_attribute_for_alias(&self, alias: &str) -> Option<SystemAttribute> {
        SystemAttribute::ALL
            .into_iter()
            .find(|attribute| self.alias_for_system_attribute(*attribute).as_deref() == Some(alias))
    }

    /// Whether a value of `actual` stored under a declaration of `declared`
    /// needs an explicit type marker.
    fn needs_type_marker(&self, declared: TypeKey, actual: TypeKey) -> bool {
        self.default_implementation_of(declared) != actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDef;
    use std::sync::Arc;

    /// Layer overriding nothing.
    struct Transparent(Box<dyn Mapper>);

    impl Mapper for Transparent {
        fn wrapped(&self) -> Option<&dyn Mapper> {
            Some(self.0.as_ref())
        }

        fn registry(&self) -> &TypeRegistry {
            self.0.registry()
        }
    }

    #[test]
    fn test_defaults_pass_through_to_base() {
        let registry = Arc::new(
            TypeRegistry::builder()
                .register(TypeDef::structure("t.Thing").field("x", "trellis.Int"))
                .build()
                .unwrap(),
        );
        let thing = registry.lookup("t.Thing").unwrap();
        let mapper = Transparent(Box::new(Transparent(Box::new(DefaultMapper::new(registry)))));

        assert_eq!(mapper.serialized_class(thing), "t.Thing");
        assert_eq!(mapper.real_class("t.Thing").unwrap(), thing);
        assert!(matches!(
            mapper.real_class("t.Nope").unwrap_err().kind(),
            ErrorKind::ClassResolution { .. }
        ));
        assert_eq!(mapper.serialized_member(thing, "x"), "x");
        assert!(mapper.should_serialize_member(thing, "x"));
        assert!(!mapper.use_attribute_for(thing, "x", TypeKey::INT));
        assert!(mapper.is_immutable_value_type(TypeKey::STRING));
        assert!(!mapper.is_immutable_value_type(thing));
        assert_eq!(mapper.default_implementation_of(thing), thing);
        assert_eq!(
            mapper.system_attribute_for_alias("defined-in"),
            Some(SystemAttribute::DefinedIn)
        );
        assert!(mapper.needs_type_marker(TypeKey::OBJECT, thing));
        assert!(!mapper.needs_type_marker(thing, thing));
        assert!(mapper.local_converter(thing, "x").is_none());
    }
}

//! Type descriptors and the frozen type registry
//!
//! Every type that can appear in a graph is described up front: its kind, its
//! position in the hierarchy and its declared fields. The registry resolves
//! field type names, validates the hierarchy and computes each struct's field
//! layout once, in ancestor-first declaration order. Objects store their field
//! values by index into that layout.

use std::fmt;

use ahash::{AHashMap, AHashSet};

use crate::error::{ErrorKind, Result};

/// Handle to a type in a [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u32);

impl TypeKey {
    /// Root of every hierarchy
    pub const OBJECT: TypeKey = TypeKey(0);
    /// Type of the null value
    pub const NULL: TypeKey = TypeKey(1);
    /// Boolean primitive
    pub const BOOL: TypeKey = TypeKey(2);
    /// 64-bit signed integer primitive
    pub const INT: TypeKey = TypeKey(3);
    /// 64-bit float primitive
    pub const FLOAT: TypeKey = TypeKey(4);
    /// Unicode scalar primitive
    pub const CHAR: TypeKey = TypeKey(5);
    /// String primitive
    pub const STRING: TypeKey = TypeKey(6);
    /// Built-in ordered list
    pub const LIST: TypeKey = TypeKey(7);
    /// Built-in association list
    pub const MAP: TypeKey = TypeKey(8);

    const BUILTIN_COUNT: usize = 9;

    /// Position in the registry.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive value categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `true` / `false`
    Bool,
    /// Signed 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// Single character
    Char,
    /// Text
    String,
}

/// Shape of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// The null type
    Null,
    /// Leaf value carried inline in [`Value`](crate::Value)
    Primitive(PrimitiveKind),
    /// Object with named fields
    Struct,
    /// Abstract contract other types implement; never instantiated
    Interface,
    /// Ordered sequence object
    List,
    /// Key/value association object
    Map,
    /// Closed set of named variants, carried inline
    Enum {
        /// Variant names in declaration order
        variants: Vec<String>,
    },
}

/// Field of a struct type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, unique within the declaring type
    pub name: String,
    /// Declared type of the field
    pub declared: TypeKey,
    /// Transient fields are never marshalled
    pub transient: bool,
    /// Type declaring the field
    pub owner: TypeKey,
}

/// Frozen description of a registered type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    name: String,
    kind: TypeKind,
    parent: Option<TypeKey>,
    interfaces: Vec<TypeKey>,
    is_abstract: bool,
    fields: Vec<FieldDescriptor>,
    layout: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Registry handle of this type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the type.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Direct supertype; `None` only for the root object type.
    pub fn parent(&self) -> Option<TypeKey> {
        self.parent
    }

    /// Directly implemented interfaces.
    pub fn interfaces(&self) -> &[TypeKey] {
        &self.interfaces
    }

    /// Whether instances may not be created directly.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Fields declared by this type itself.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// All fields of an instance, most basic type's fields first.
    pub fn layout(&self) -> &[FieldDescriptor] {
        &self.layout
    }

    /// Whether objects of this type live in the graph arena.
    pub fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Struct | TypeKind::List | TypeKind::Map)
    }

    /// Whether an object of this type can be allocated.
    pub fn is_instantiable(&self) -> bool {
        self.is_object() && !self.is_abstract
    }
}

/// Field definition awaiting name resolution
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    type_name: String,
    transient: bool,
}

/// Type definition awaiting registration
///
/// ```
/// use trellis_core::{TypeDef, TypeRegistry};
///
/// let registry = TypeRegistry::builder()
///     .register(TypeDef::structure("acme.Person").field("name", "trellis.String"))
///     .register(TypeDef::structure("acme.Employee").extends("acme.Person").field("badge", "trellis.Int"))
///     .build()
///     .unwrap();
///
/// let employee = registry.lookup("acme.Employee").unwrap();
/// let names: Vec<_> = registry.get(employee).layout().iter().map(|f| f.name.as_str()).collect();
/// assert_eq!(names, ["name", "badge"]);
/// ```
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: String,
    kind: TypeKind,
    parent: Option<String>,
    interfaces: Vec<String>,
    is_abstract: bool,
    fields: Vec<FieldDef>,
}

impl TypeDef {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            interfaces: Vec::new(),
            is_abstract: false,
            fields: Vec::new(),
        }
    }

    /// Struct type with named fields.
    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    /// Interface type.
    pub fn interface(name: impl Into<String>) -> Self {
        let mut def = Self::new(name, TypeKind::Interface);
        def.is_abstract = true;
        def
    }

    /// List type.
    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::List)
    }

    /// Map type.
    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Map)
    }

    /// Enum type with the given variants.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            TypeKind::Enum {
                variants: variants.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Set the direct supertype.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add an implemented interface.
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Mark the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare a field.
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            type_name: type_name.into(),
            transient: false,
        });
        self
    }

    /// Declare a field that is never marshalled.
    pub fn transient_field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            type_name: type_name.into(),
            transient: true,
        });
        self
    }
}

/// Collects type definitions and freezes them into a [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct TypeRegistryBuilder {
    defs: Vec<TypeDef>,
}

impl Default for TypeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistryBuilder {
    /// Builder preloaded with the built-in types.
    pub fn new() -> Self {
        // Order must match the TypeKey constants.
        let defs = vec![
            TypeDef::structure("trellis.Object"),
            TypeDef::new("trellis.Null", TypeKind::Null),
            TypeDef::new("trellis.Boolean", TypeKind::Primitive(PrimitiveKind::Bool)),
            TypeDef::new("trellis.Int", TypeKind::Primitive(PrimitiveKind::Int)),
            TypeDef::new("trellis.Float", TypeKind::Primitive(PrimitiveKind::Float)),
            TypeDef::new("trellis.Char", TypeKind::Primitive(PrimitiveKind::Char)),
            TypeDef::new("trellis.String", TypeKind::Primitive(PrimitiveKind::String)),
            TypeDef::list("trellis.List"),
            TypeDef::map("trellis.Map"),
        ];
        debug_assert_eq!(defs.len(), TypeKey::BUILTIN_COUNT);
        Self { defs }
    }

    /// Add a type definition.
    pub fn register(mut self, def: TypeDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Resolve names, validate the hierarchy and compute field layouts.
    pub fn build(self) -> Result<TypeRegistry> {
        let mut by_name = AHashMap::with_capacity(self.defs.len());
        for (index, def) in self.defs.iter().enumerate() {
            if by_name.insert(def.name.clone(), TypeKey(index as u32)).is_some() {
                return Err(invalid(format!("type '{}' registered twice", def.name)));
            }
        }
        let resolve = |name: &str, context: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| invalid(format!("{} refers to unknown type '{}'", context, name)))
        };

        let mut types = Vec::with_capacity(self.defs.len());
        for (index, def) in self.defs.iter().enumerate() {
            let key = TypeKey(index as u32);
            let parent = match &def.parent {
                Some(name) => Some(resolve(name, &format!("parent of '{}'", def.name))?),
                None if key == TypeKey::OBJECT => None,
                None => Some(TypeKey::OBJECT),
            };
            let interfaces = def
                .interfaces
                .iter()
                .map(|name| resolve(name, &format!("interface of '{}'", def.name)))
                .collect::<Result<Vec<_>>>()?;

            if !def.fields.is_empty() && def.kind != TypeKind::Struct {
                return Err(invalid(format!("only struct types declare fields, '{}' does not", def.name)));
            }
            let mut seen = AHashSet::new();
            let mut fields = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(invalid(format!("field '{}' declared twice in '{}'", field.name, def.name)));
                }
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    declared: resolve(&field.type_name, &format!("field '{}.{}'", def.name, field.name))?,
                    transient: field.transient,
                    owner: key,
                });
            }

            types.push(TypeDescriptor {
                key,
                name: def.name.clone(),
                kind: def.kind.clone(),
                parent,
                interfaces,
                is_abstract: def.is_abstract,
                fields,
                layout: Vec::new(),
            });
        }

        validate_hierarchy(&types)?;

        for index in 0..types.len() {
            let mut chain = Vec::new();
            let mut cursor = Some(TypeKey(index as u32));
            while let Some(key) = cursor {
                chain.push(key);
                cursor = types[key.index()].parent;
            }
            let layout: Vec<FieldDescriptor> = chain
                .iter()
                .rev()
                .flat_map(|key| types[key.index()].fields.iter().cloned())
                .collect();
            types[index].layout = layout;
        }

        Ok(TypeRegistry { types, by_name })
    }
}

fn invalid(message: String) -> crate::error::ConversionError {
    ErrorKind::InvalidConfiguration(message).into()
}

fn validate_hierarchy(types: &[TypeDescriptor]) -> Result<()> {
    for descriptor in types {
        if let Some(parent) = descriptor.parent {
            let parent_desc = &types[parent.index()];
            let compatible = parent == TypeKey::OBJECT || parent_desc.kind == descriptor.kind;
            if !compatible || parent_desc.kind == TypeKind::Interface {
                return Err(invalid(format!(
                    "'{}' cannot extend '{}'",
                    descriptor.name, parent_desc.name
                )));
            }
        }
        for interface in &descriptor.interfaces {
            if types[interface.index()].kind != TypeKind::Interface {
                return Err(invalid(format!(
                    "'{}' implements '{}', which is not an interface",
                    descriptor.name,
                    types[interface.index()].name
                )));
            }
        }

        let mut steps = 0;
        let mut cursor = descriptor.parent;
        while let Some(key) = cursor {
            steps += 1;
            if steps > types.len() {
                return Err(invalid(format!("inheritance cycle through '{}'", descriptor.name)));
            }
            cursor = types[key.index()].parent;
        }
    }
    Ok(())
}

/// Immutable set of type descriptors shared by every conversion.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: AHashMap<String, TypeKey>,
}

impl TypeRegistry {
    /// Start a builder preloaded with the built-in types.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Descriptor of `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` was issued by a different registry holding fewer types.
    pub fn get(&self, key: TypeKey) -> &TypeDescriptor {
        &self.types[key.index()]
    }

    /// Canonical name of `key`.
    pub fn name(&self, key: TypeKey) -> &str {
        self.get(key).name()
    }

    /// Resolve a canonical name.
    pub fn lookup(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    /// Number of registered types, built-ins included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false: the built-ins are always present.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    /// `key` followed by its superclasses up to the root.
    pub fn ancestors(&self, key: TypeKey) -> impl Iterator<Item = TypeKey> + '_ {
        std::iter::successors(Some(key), move |current| self.get(*current).parent())
    }

    /// Whether a value of type `from` may be stored where `to` is declared.
    pub fn is_assignable(&self, from: TypeKey, to: TypeKey) -> bool {
        if from == to || to == TypeKey::OBJECT {
            return true;
        }
        let mut pending = vec![from];
        let mut visited = AHashSet::new();
        while let Some(current) = pending.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            let descriptor = self.get(current);
            pending.extend(descriptor.parent());
            pending.extend(descriptor.interfaces().iter().copied());
        }
        false
    }

    /// Layout index of the most derived field called `name`.
    pub fn field_index(&self, ty: TypeKey, name: &str) -> Option<usize> {
        self.get(ty).layout().iter().rposition(|field| field.name == name)
    }

    /// Layout index of field `name` as declared by `owner`.
    pub fn field_index_in(&self, ty: TypeKey, owner: TypeKey, name: &str) -> Option<usize> {
        self.get(ty)
            .layout()
            .iter()
            .position(|field| field.owner == owner && field.name == name)
    }

    /// Whether the field at `index` is hidden by a same-named field of a subtype.
    pub fn is_shadowed(&self, ty: TypeKey, index: usize) -> bool {
        let layout = self.get(ty).layout();
        match layout.get(index) {
            Some(field) => layout[index + 1..].iter().any(|other| other.name == field.name),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoo() -> TypeRegistry {
        TypeRegistry::builder()
            .register(TypeDef::interface("zoo.Named"))
            .register(
                TypeDef::structure("zoo.Animal")
                    .abstract_type()
                    .implements("zoo.Named")
                    .field("name", "trellis.String")
                    .transient_field("cache", "trellis.Int"),
            )
            .register(
                TypeDef::structure("zoo.Dog")
                    .extends("zoo.Animal")
                    .field("good", "trellis.Boolean")
                    .field("name", "trellis.String"),
            )
            .register(TypeDef::enumeration("zoo.Size", ["SMALL", "LARGE"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builtin_keys() {
        let registry = zoo();
        assert_eq!(registry.lookup("trellis.String"), Some(TypeKey::STRING));
        assert_eq!(registry.lookup("trellis.Map"), Some(TypeKey::MAP));
        assert_eq!(registry.name(TypeKey::NULL), "trellis.Null");
        assert_eq!(registry.get(TypeKey::INT).parent(), Some(TypeKey::OBJECT));
        assert_eq!(registry.get(TypeKey::OBJECT).parent(), None);
    }

    #[test]
    fn test_layout_is_ancestor_first() {
        let registry = zoo();
        let dog = registry.lookup("zoo.Dog").unwrap();
        let names: Vec<_> = registry.get(dog).layout().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "cache", "good", "name"]);
        assert!(registry.get(dog).layout()[1].transient);
    }

    #[test]
    fn test_shadowed_fields() {
        let registry = zoo();
        let dog = registry.lookup("zoo.Dog").unwrap();
        let animal = registry.lookup("zoo.Animal").unwrap();
        assert_eq!(registry.field_index(dog, "name"), Some(3));
        assert_eq!(registry.field_index_in(dog, animal, "name"), Some(0));
        assert!(registry.is_shadowed(dog, 0));
        assert!(!registry.is_shadowed(dog, 3));
    }

    #[test]
    fn test_assignability() {
        let registry = zoo();
        let dog = registry.lookup("zoo.Dog").unwrap();
        let animal = registry.lookup("zoo.Animal").unwrap();
        let named = registry.lookup("zoo.Named").unwrap();
        assert!(registry.is_assignable(dog, animal));
        assert!(registry.is_assignable(dog, named));
        assert!(registry.is_assignable(dog, TypeKey::OBJECT));
        assert!(!registry.is_assignable(animal, dog));
        assert!(!registry.is_assignable(TypeKey::STRING, named));
    }

    #[test]
    fn test_instantiability() {
        let registry = zoo();
        assert!(!registry.get(registry.lookup("zoo.Animal").unwrap()).is_instantiable());
        assert!(!registry.get(registry.lookup("zoo.Named").unwrap()).is_instantiable());
        assert!(registry.get(registry.lookup("zoo.Dog").unwrap()).is_instantiable());
        assert!(!registry.get(registry.lookup("zoo.Size").unwrap()).is_instantiable());
        assert!(registry.get(TypeKey::LIST).is_instantiable());
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let err = TypeRegistry::builder()
            .register(TypeDef::structure("a.B").field("x", "a.Missing"))
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(msg) if msg.contains("a.Missing")));
    }

    #[test]
    fn test_hierarchy_errors() {
        let duplicate = TypeRegistry::builder()
            .register(TypeDef::structure("a.A"))
            .register(TypeDef::structure("a.A"))
            .build();
        assert!(duplicate.is_err());

        let cycle = TypeRegistry::builder()
            .register(TypeDef::structure("a.A").extends("a.B"))
            .register(TypeDef::structure("a.B").extends("a.A"))
            .build();
        assert!(cycle.is_err());

        let not_interface = TypeRegistry::builder()
            .register(TypeDef::structure("a.A"))
            .register(TypeDef::structure("a.B").implements("a.A"))
            .build();
        assert!(not_interface.is_err());

        let list_fields = TypeRegistry::builder()
            .register(TypeDef::list("a.L").field("x", "trellis.Int"))
            .build();
        assert!(list_fields.is_err());
    }
}

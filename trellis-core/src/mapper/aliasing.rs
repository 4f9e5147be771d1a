//! Aliasing layers: package, class, field and system attribute names

use std::borrow::Cow;

use ahash::{AHashMap, AHashSet};

use super::{Mapper, SystemAttribute};
use crate::error::Result;
use crate::types::{TypeKey, TypeRegistry};

/// Replaces namespace prefixes of type names.
///
/// With `acme.zoo` aliased to `z`, `acme.zoo.Dog` is written as `z.Dog`. An
/// empty alias drops the namespace entirely. The longest matching namespace
/// wins.
pub struct PackageAliasingMapper {
    inner: Box<dyn Mapper>,
    // (package, alias), longest package first
    packages: Vec<(String, String)>,
}

impl PackageAliasingMapper {
    /// Wrap `inner` without aliases.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            packages: Vec::new(),
        }
    }

    /// Write types of `package` under `alias`.
    pub fn add_package_alias(&mut self, alias: impl Into<String>, package: impl Into<String>) {
        let package = package.into();
        self.packages.retain(|(existing, _)| *existing != package);
        self.packages.push((package, alias.into()));
        self.packages.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }
}

impl Mapper for PackageAliasingMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn serialized_class(&self, ty: TypeKey) -> Cow<'_, str> {
        let name = self.inner.serialized_class(ty);
        for (package, alias) in &self.packages {
            if let Some(rest) = name.strip_prefix(package.as_str()).and_then(|r| r.strip_prefix('.')) {
                return Cow::Owned(if alias.is_empty() {
                    rest.to_string()
                } else {
                    format!("{}.{}", alias, rest)
                });
            }
        }
        name
    }

    fn real_class(&self, name: &str) -> Result<TypeKey> {
        for (package, alias) in &self.packages {
            let candidate = if alias.is_empty() {
                Some(format!("{}.{}", package, name))
            } else {
                name.strip_prefix(alias.as_str())
                    .filter(|rest| rest.starts_with('.'))
                    .map(|rest| format!("{}{}", package, rest))
            };
            if let Some(candidate) = candidate {
                if let Ok(ty) = self.inner.real_class(&candidate) {
                    return Ok(ty);
                }
            }
        }
        self.inner.real_class(name)
    }
}

/// Short names for individual types.
pub struct ClassAliasingMapper {
    inner: Box<dyn Mapper>,
    type_to_alias: AHashMap<TypeKey, String>,
    alias_to_type: AHashMap<String, TypeKey>,
}

impl ClassAliasingMapper {
    /// Wrap `inner` without aliases.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            type_to_alias: AHashMap::new(),
            alias_to_type: AHashMap::new(),
        }
    }

    /// Write `ty` as `alias` and read `alias` as `ty`. A later alias for the
    /// same type replaces the name it is written under; earlier aliases still
    /// resolve on read.
    pub fn add_class_alias(&mut self, alias: impl Into<String>, ty: TypeKey) {
        let alias = alias.into();
        self.alias_to_type.insert(alias.clone(), ty);
        self.type_to_alias.insert(ty, alias);
    }

    /// Number of aliases that resolve on read.
    pub fn alias_count(&self) -> usize {
        self.alias_to_type.len()
    }
}

impl Mapper for ClassAliasingMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn serialized_class(&self, ty: TypeKey) -> Cow<'_, str> {
        match self.type_to_alias.get(&ty) {
            Some(alias) => Cow::Borrowed(alias),
            None => self.inner.serialized_class(ty),
        }
    }

    fn real_class(&self, name: &str) -> Result<TypeKey> {
        match self.alias_to_type.get(name) {
            Some(ty) => Ok(*ty),
            None => self.inner.real_class(name),
        }
    }
}

/// Field aliases and omitted fields.
///
/// Both are keyed by the type that configured them and apply to that type
/// and its subtypes.
pub struct FieldAliasingMapper {
    inner: Box<dyn Mapper>,
    aliases: AHashMap<TypeKey, AHashMap<String, String>>,
    real_names: AHashMap<TypeKey, AHashMap<String, String>>,
    omitted: AHashMap<TypeKey, AHashSet<String>>,
}

impl FieldAliasingMapper {
    /// Wrap `inner` without field policies.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            aliases: AHashMap::new(),
            real_names: AHashMap::new(),
            omitted: AHashMap::new(),
        }
    }

    /// Write field `field` of `owner` as `alias`.
    pub fn add_field_alias(&mut self, owner: TypeKey, field: impl Into<String>, alias: impl Into<String>) {
        let field = field.into();
        let alias = alias.into();
        self.real_names
            .entry(owner)
            .or_default()
            .insert(alias.clone(), field.clone());
        self.aliases.entry(owner).or_default().insert(field, alias);
    }

    /// Never write or read field `field` of `owner`.
    pub fn omit_field(&mut self, owner: TypeKey, field: impl Into<String>) {
        self.omitted.entry(owner).or_default().insert(field.into());
    }
}

impl Mapper for FieldAliasingMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn serialized_member<'a>(&'a self, owner: TypeKey, field: &'a str) -> Cow<'a, str> {
        for ty in self.registry().ancestors(owner) {
            if let Some(alias) = self.aliases.get(&ty).and_then(|names| names.get(field)) {
                return Cow::Borrowed(alias);
            }
        }
        self.inner.serialized_member(owner, field)
    }

    fn real_member<'a>(&'a self, owner: TypeKey, serialized: &'a str) -> Cow<'a, str> {
        for ty in self.registry().ancestors(owner) {
            if let Some(field) = self.real_names.get(&ty).and_then(|names| names.get(serialized)) {
                return Cow::Borrowed(field);
            }
        }
        self.inner.real_member(owner, serialized)
    }

    fn should_serialize_member(&self, owner: TypeKey, field: &str) -> bool {
        let omitted = self
            .registry()
            .ancestors(owner)
            .any(|ty| self.omitted.get(&ty).is_some_and(|fields| fields.contains(field)));
        !omitted && self.inner.should_serialize_member(owner, field)
    }
}

/// Renames or disables system attributes.
pub struct SystemAttributeAliasingMapper {
    inner: Box<dyn Mapper>,
    aliases: AHashMap<SystemAttribute, Option<String>>,
}

impl SystemAttributeAliasingMapper {
    /// Wrap `inner` with default attribute names.
    pub fn new(inner: Box<dyn Mapper>) -> Self {
        Self {
            inner,
            aliases: AHashMap::new(),
        }
    }

    /// Write `attribute` as `alias`, or never write it when `alias` is `None`.
    pub fn add_alias(&mut self, attribute: SystemAttribute, alias: Option<String>) {
        self.aliases.insert(attribute, alias);
    }
}

impl Mapper for SystemAttributeAliasingMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn alias_for_system_attribute(&self, attribute: SystemAttribute) -> Option<Cow<'_, str>> {
        match self.aliases.get(&attribute) {
            Some(alias) => alias.as_deref().map(Cow::Borrowed),
            None => self.inner.alias_for_system_attribute(attribute),
        }
    }
}

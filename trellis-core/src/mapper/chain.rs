//! Assembly of the standard mapper chain

use std::fmt;
use std::sync::Arc;

use super::{
    AttributeMapper, CachingMapper, ClassAliasingMapper, DefaultImplementationsMapper, DefaultMapper,
    ElementIgnoringMapper, EnumMapper, FieldAliasingMapper, ImmutableTypesMapper, ImplicitCollection,
    ImplicitCollectionMapper, LocalConversionMapper, Mapper, PackageAliasingMapper, SecurityMapper, SystemAttribute,
    SystemAttributeAliasingMapper,
};
use crate::converter::Converter;
use crate::error::{ErrorKind, Result};
use crate::security::TypePermission;
use crate::types::{TypeKey, TypeKind, TypeRegistry};

/// Wraps the built-in policy layers in a user-supplied layer.
pub type MapperLayer = Box<dyn FnOnce(Box<dyn Mapper>) -> Box<dyn Mapper> + Send>;

#[derive(Debug, Clone)]
struct ImplicitCollectionSpec {
    owner: String,
    field: String,
    item_type: Option<String>,
    item_name: Option<String>,
}

/// Collects mapper configuration by type name and assembles the chain.
///
/// Layers are stacked innermost first: default, package aliasing, class
/// aliasing, element ignoring, field aliasing, system attribute aliasing,
/// implicit collections, default implementations, attributes, enums,
/// immutable types, local converters, user layers, security, caching. Type
/// names are resolved against the registry in [`build`](Self::build).
#[derive(Default)]
pub struct MapperChainBuilder {
    package_aliases: Vec<(String, String)>,
    class_aliases: Vec<(String, String)>,
    ignore_unknown_elements: bool,
    ignored_elements: Vec<String>,
    field_aliases: Vec<(String, String, String)>,
    omitted_fields: Vec<(String, String)>,
    system_attributes: Vec<(SystemAttribute, Option<String>)>,
    implicit_collections: Vec<ImplicitCollectionSpec>,
    default_implementations: Vec<(String, String)>,
    attribute_fields: Vec<(String, String)>,
    attribute_types: Vec<String>,
    immutable_types: Vec<String>,
    local_converters: Vec<(String, String, Arc<dyn Converter>)>,
    layers: Vec<MapperLayer>,
    permissions: Vec<Arc<dyn TypePermission>>,
}

impl fmt::Debug for MapperChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperChainBuilder")
            .field("class_aliases", &self.class_aliases.len())
            .field("field_aliases", &self.field_aliases.len())
            .field("local_converters", &self.local_converters.len())
            .field("layers", &self.layers.len())
            .field("permissions", &self.permissions.len())
            .finish_non_exhaustive()
    }
}

impl MapperChainBuilder {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write types in namespace `package` with the prefix `alias`.
    pub fn alias_package(&mut self, alias: impl Into<String>, package: impl Into<String>) -> &mut Self {
        self.package_aliases.push((alias.into(), package.into()));
        self
    }

    /// Write type `type_name` as `alias`.
    pub fn alias_class(&mut self, alias: impl Into<String>, type_name: impl Into<String>) -> &mut Self {
        self.class_aliases.push((alias.into(), type_name.into()));
        self
    }

    /// Skip elements matching no field instead of failing.
    pub fn ignore_unknown_elements(&mut self, ignore: bool) -> &mut Self {
        self.ignore_unknown_elements = ignore;
        self
    }

    /// Skip unmatched elements called `name`.
    pub fn ignore_element(&mut self, name: impl Into<String>) -> &mut Self {
        self.ignored_elements.push(name.into());
        self
    }

    /// Write field `field` of `type_name` as `alias`.
    pub fn alias_field(
        &mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> &mut Self {
        self.field_aliases.push((type_name.into(), field.into(), alias.into()));
        self
    }

    /// Never write or read field `field` of `type_name`.
    pub fn omit_field(&mut self, type_name: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.omitted_fields.push((type_name.into(), field.into()));
        self
    }

    /// Rename a system attribute, or disable it with `None`.
    pub fn alias_system_attribute(&mut self, attribute: SystemAttribute, alias: Option<String>) -> &mut Self {
        self.system_attributes.push((attribute, alias));
        self
    }

    /// Write list field `field` of `type_name` as bare items.
    pub fn add_implicit_collection(
        &mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        item_type: Option<&str>,
        item_name: Option<&str>,
    ) -> &mut Self {
        self.implicit_collections.push(ImplicitCollectionSpec {
            owner: type_name.into(),
            field: field.into(),
            item_type: item_type.map(str::to_string),
            item_name: item_name.map(str::to_string),
        });
        self
    }

    /// Instantiate `implementation` for declarations of `declared`.
    pub fn add_default_implementation(
        &mut self,
        declared: impl Into<String>,
        implementation: impl Into<String>,
    ) -> &mut Self {
        self.default_implementations
            .push((declared.into(), implementation.into()));
        self
    }

    /// Place field `field` of `type_name` in an attribute.
    pub fn use_attribute_for_field(&mut self, type_name: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.attribute_fields.push((type_name.into(), field.into()));
        self
    }

    /// Place every field declared as `type_name` in an attribute.
    pub fn use_attribute_for_type(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.attribute_types.push(type_name.into());
        self
    }

    /// Exclude instances of `type_name` from reference tracking.
    pub fn add_immutable_type(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.immutable_types.push(type_name.into());
        self
    }

    /// Convert field `field` of `type_name` with `converter` instead of the
    /// one the lookup picks.
    pub fn add_local_converter(
        &mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) -> &mut Self {
        self.local_converters.push((type_name.into(), field.into(), converter));
        self
    }

    /// Wrap the policy layers in a custom layer. Later layers wrap earlier ones.
    pub fn add_layer(&mut self, layer: MapperLayer) -> &mut Self {
        self.layers.push(layer);
        self
    }

    /// Add a type permission. Newer permissions take precedence.
    pub fn add_permission(&mut self, permission: Arc<dyn TypePermission>) -> &mut Self {
        self.permissions.push(permission);
        self
    }

    /// Number of class aliases configured so far.
    pub fn class_alias_count(&self) -> usize {
        self.class_aliases.len()
    }

    /// Resolve every type name and stack the layers.
    pub fn build(self, registry: Arc<TypeRegistry>) -> Result<Box<dyn Mapper>> {
        let resolve = |name: &str| {
            registry.lookup(name).ok_or_else(|| {
                ErrorKind::InvalidConfiguration(format!("mapper configuration names unknown type '{}'", name))
            })
        };
        let require_field = |owner: TypeKey, field: &str| {
            registry.field_index(owner, field).ok_or_else(|| {
                ErrorKind::InvalidConfiguration(format!(
                    "type '{}' has no field '{}'",
                    registry.name(owner),
                    field
                ))
            })
        };

        let mut mapper: Box<dyn Mapper> = Box::new(DefaultMapper::new(registry.clone()));

        let mut packages = PackageAliasingMapper::new(mapper);
        for (alias, package) in &self.package_aliases {
            packages.add_package_alias(alias.as_str(), package.as_str());
        }
        mapper = Box::new(packages);

        let mut classes = ClassAliasingMapper::new(mapper);
        for (alias, type_name) in &self.class_aliases {
            classes.add_class_alias(alias.as_str(), resolve(type_name.as_str())?);
        }
        mapper = Box::new(classes);

        let mut ignoring = ElementIgnoringMapper::new(mapper);
        ignoring.ignore_unknown_elements(self.ignore_unknown_elements);
        for name in &self.ignored_elements {
            ignoring.ignore_element(name.as_str());
        }
        mapper = Box::new(ignoring);

        let mut fields = FieldAliasingMapper::new(mapper);
        for (type_name, field, alias) in &self.field_aliases {
            let owner = resolve(type_name.as_str())?;
            require_field(owner, field.as_str())?;
            fields.add_field_alias(owner, field.as_str(), alias.as_str());
        }
        for (type_name, field) in &self.omitted_fields {
            let owner = resolve(type_name.as_str())?;
            require_field(owner, field.as_str())?;
            fields.omit_field(owner, field.as_str());
        }
        mapper = Box::new(fields);

        let mut system = SystemAttributeAliasingMapper::new(mapper);
        for (attribute, alias) in &self.system_attributes {
            system.add_alias(*attribute, alias.clone());
        }
        mapper = Box::new(system);

        let mut implicit = ImplicitCollectionMapper::new(mapper);
        for spec in &self.implicit_collections {
            let owner = resolve(spec.owner.as_str())?;
            let index = require_field(owner, spec.field.as_str())?;
            let declared = registry.get(owner).layout()[index].declared;
            let declared_kind = registry.get(declared).kind();
            if !matches!(declared_kind, TypeKind::List | TypeKind::Interface) && declared != TypeKey::OBJECT {
                return Err(ErrorKind::InvalidConfiguration(format!(
                    "implicit collection '{}.{}' is not list-typed",
                    spec.owner, spec.field
                ))
                .into());
            }
            implicit.add(ImplicitCollection {
                owner,
                field: spec.field.clone(),
                item_type: spec.item_type.as_deref().map(resolve).transpose()?,
                item_name: spec.item_name.clone(),
            });
        }
        mapper = Box::new(implicit);

        let mut defaults = DefaultImplementationsMapper::new(mapper);
        for (declared, implementation) in &self.default_implementations {
            let declared_key = resolve(declared.as_str())?;
            let implementation_key = resolve(implementation.as_str())?;
            if !registry.is_assignable(implementation_key, declared_key)
                || !registry.get(implementation_key).is_instantiable()
            {
                return Err(ErrorKind::InvalidConfiguration(format!(
                    "'{}' is not an instantiable implementation of '{}'",
                    implementation, declared
                ))
                .into());
            }
            defaults.add_default_implementation(declared_key, implementation_key);
        }
        mapper = Box::new(defaults);

        let mut attributes = AttributeMapper::new(mapper);
        for (type_name, field) in &self.attribute_fields {
            let owner = resolve(type_name.as_str())?;
            require_field(owner, field.as_str())?;
            attributes.add_attribute_field(owner, field.as_str());
        }
        for type_name in &self.attribute_types {
            attributes.add_attribute_type(resolve(type_name.as_str())?);
        }
        mapper = Box::new(EnumMapper::new(Box::new(attributes)));

        let mut immutable = ImmutableTypesMapper::new(mapper);
        for type_name in &self.immutable_types {
            immutable.add_immutable_type(resolve(type_name.as_str())?);
        }
        mapper = Box::new(immutable);

        let mut local = LocalConversionMapper::new(mapper);
        for (type_name, field, converter) in self.local_converters {
            let owner = resolve(type_name.as_str())?;
            require_field(owner, field.as_str())?;
            local.add_local_converter(owner, field, converter);
        }
        mapper = Box::new(local);

        for layer in self.layers {
            mapper = layer(mapper);
        }

        mapper = Box::new(SecurityMapper::new(mapper, self.permissions));
        Ok(Box::new(CachingMapper::new(mapper)))
    }
}

//! Engine configuration
//!
//! [`EngineBuilder`] collects aliases, converters, permissions and options.
//! [`EngineBuilder::build`] resolves every name against the type registry and
//! freezes the result into an [`Engine`]; nothing can be reconfigured after
//! that point.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use trellis_core::converter::register_builtin_converters;
use trellis_core::security::{
    AnyTypePermission, Denied, ExplicitTypePermission, NullPermission, PrimitiveTypePermission,
    TypeHierarchyPermission, WildcardTypePermission,
};
use trellis_core::{
    Converter, ConverterLookup, MapperChainBuilder, MapperLayer, ReferenceMode, Result,
    SingleValueConverter, SingleValueConverterWrapper, SystemAttribute, TypePermission, TypeRegistry,
};
use trellis_stream::NameCoder;

use crate::engine::Engine;
use crate::options::EngineOptions;

/// Short names registered for the built-in types unless disabled
pub const DEFAULT_ALIASES: [(&str, &str); 9] = [
    ("null", "trellis.Null"),
    ("boolean", "trellis.Boolean"),
    ("int", "trellis.Int"),
    ("float", "trellis.Float"),
    ("char", "trellis.Char"),
    ("string", "trellis.String"),
    ("list", "trellis.List"),
    ("map", "trellis.Map"),
    ("object", "trellis.Object"),
];

/// Consuming builder for an [`Engine`]
///
/// ```
/// use trellis::{Engine, ReferenceMode};
/// use trellis_core::{TypeDef, TypeRegistry};
///
/// let registry = TypeRegistry::builder()
///     .register(TypeDef::structure("acme.Person").field("name", "trellis.String"))
///     .build()
///     .unwrap();
/// let engine = Engine::builder(registry)
///     .alias("person", "acme.Person")
///     .allow_types(["acme.Person"])
///     .reference_mode(ReferenceMode::RelativePath)
///     .build()
///     .unwrap();
/// assert_eq!(engine.options().reference_mode, ReferenceMode::RelativePath);
/// ```
pub struct EngineBuilder {
    registry: Arc<TypeRegistry>,
    options: EngineOptions,
    mapper: MapperChainBuilder,
    aliases: Vec<(String, String)>,
    converters: Vec<(Arc<dyn Converter>, i32)>,
    permissions: Vec<Arc<dyn TypePermission>>,
    name_coder: Option<Arc<dyn NameCoder>>,
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("types", &self.registry.len())
            .field("options", &self.options)
            .field("mapper", &self.mapper)
            .field("aliases", &self.aliases)
            .field("converters", &self.converters.len())
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl EngineBuilder {
    /// Start configuring an engine over `registry`.
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            options: EngineOptions::default(),
            mapper: MapperChainBuilder::new(),
            aliases: Vec::new(),
            converters: Vec::new(),
            permissions: Vec::new(),
            name_coder: None,
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Select how repeated objects are marked.
    pub fn reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.options.reference_mode = mode;
        self
    }

    /// Skip unknown elements instead of failing.
    pub fn ignore_unknown_elements(mut self, ignore: bool) -> Self {
        self.options.ignore_unknown_elements = ignore;
        self
    }

    /// Use a custom name coder instead of the one selected in the options.
    pub fn name_coder(mut self, coder: Arc<dyn NameCoder>) -> Self {
        self.name_coder = Some(coder);
        self
    }

    /// Write `type_name` as `alias` and resolve `alias` back to it.
    pub fn alias(mut self, alias: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), type_name.into()));
        self
    }

    /// Write types of namespace `package` under namespace `alias`.
    pub fn alias_package(mut self, alias: impl Into<String>, package: impl Into<String>) -> Self {
        self.mapper.alias_package(alias, package);
        self
    }

    /// Write field `field` of `type_name` as `alias`.
    pub fn alias_field(
        mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        self.mapper.alias_field(type_name, field, alias);
        self
    }

    /// Rename a system attribute.
    pub fn alias_system_attribute(mut self, attribute: SystemAttribute, alias: impl Into<String>) -> Self {
        self.mapper.alias_system_attribute(attribute, Some(alias.into()));
        self
    }

    /// Never write a system attribute.
    pub fn disable_system_attribute(mut self, attribute: SystemAttribute) -> Self {
        self.mapper.alias_system_attribute(attribute, None);
        self
    }

    /// Never write or read field `field` of `type_name`.
    pub fn omit_field(mut self, type_name: impl Into<String>, field: impl Into<String>) -> Self {
        self.mapper.omit_field(type_name, field);
        self
    }

    /// Silently skip elements named `name` wherever they are unknown.
    pub fn ignore_element(mut self, name: impl Into<String>) -> Self {
        self.mapper.ignore_element(name);
        self
    }

    /// Write the list field `field` of `type_name` as bare sibling items.
    pub fn implicit_collection(mut self, type_name: impl Into<String>, field: impl Into<String>) -> Self {
        self.mapper.add_implicit_collection(type_name, field, None, None);
        self
    }

    /// Like [`implicit_collection`](Self::implicit_collection), collecting only
    /// items of `item_type` written as elements named `item_name`.
    pub fn named_implicit_collection(
        mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        item_type: &str,
        item_name: &str,
    ) -> Self {
        self.mapper
            .add_implicit_collection(type_name, field, Some(item_type), Some(item_name));
        self
    }

    /// Instantiate `implementation` where `declared` is expected and no
    /// class marker says otherwise.
    pub fn default_implementation(mut self, declared: impl Into<String>, implementation: impl Into<String>) -> Self {
        self.mapper.add_default_implementation(declared, implementation);
        self
    }

    /// Place field `field` of `type_name` in an attribute.
    pub fn use_attribute_for_field(mut self, type_name: impl Into<String>, field: impl Into<String>) -> Self {
        self.mapper.use_attribute_for_field(type_name, field);
        self
    }

    /// Place every field declared as `type_name` in an attribute.
    pub fn use_attribute_for_type(mut self, type_name: impl Into<String>) -> Self {
        self.mapper.use_attribute_for_type(type_name);
        self
    }

    /// Treat instances of `type_name` as values: written in full at every
    /// occurrence, never referenced.
    pub fn immutable_type(mut self, type_name: impl Into<String>) -> Self {
        self.mapper.add_immutable_type(type_name);
        self
    }

    /// Wrap the built-in policy layers in a custom mapper layer.
    pub fn mapper_layer(mut self, layer: MapperLayer) -> Self {
        self.mapper.add_layer(layer);
        self
    }

    /// Register `converter` at `priority`. Later registrations win ties.
    pub fn register_converter(mut self, converter: Arc<dyn Converter>, priority: i32) -> Self {
        self.converters.push((converter, priority));
        self
    }

    /// Convert field `field` of `type_name` (and of its subtypes) with
    /// `converter`, whatever the lookup would pick for the field's value.
    pub fn register_local_converter(
        mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        self.mapper.add_local_converter(type_name, field, converter);
        self
    }

    /// Register a text converter at `priority`.
    pub fn register_single_value_converter<S>(self, converter: S, priority: i32) -> Self
    where
        S: SingleValueConverter + 'static,
    {
        self.register_converter(Arc::new(SingleValueConverterWrapper::new(converter)), priority)
    }

    /// Add a type permission. Later permissions take precedence.
    pub fn permit(mut self, permission: Arc<dyn TypePermission>) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Allow the named types.
    pub fn allow_types<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permit(Arc::new(ExplicitTypePermission::new(names)))
    }

    /// Allow types whose names match any of the wildcard `patterns`.
    pub fn allow_types_matching<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permit(Arc::new(WildcardTypePermission::new(patterns)))
    }

    /// Allow `root` and every type assignable to it.
    pub fn allow_type_hierarchy(self, root: impl Into<String>) -> Self {
        self.permit(Arc::new(TypeHierarchyPermission::new(root)))
    }

    /// Forbid the named types, overriding earlier permissions.
    pub fn deny_types<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permit(Arc::new(Denied(ExplicitTypePermission::new(names))))
    }

    /// Allow every type. Only for trusted input.
    pub fn allow_any_type(self) -> Self {
        self.permit(Arc::new(AnyTypePermission))
    }

    /// Validate the configuration and freeze it into an engine.
    pub fn build(self) -> Result<Engine> {
        let EngineBuilder {
            registry,
            options,
            mut mapper,
            aliases,
            converters,
            permissions,
            name_coder,
        } = self;

        // Later aliases for the same type win, so defaults go first.
        if options.default_aliases {
            for (alias, type_name) in DEFAULT_ALIASES {
                mapper.alias_class(alias, type_name);
            }
        }
        for (alias, type_name) in aliases {
            mapper.alias_class(alias, type_name);
        }
        mapper.ignore_unknown_elements(options.ignore_unknown_elements);

        mapper
            .add_permission(Arc::new(NullPermission))
            .add_permission(Arc::new(PrimitiveTypePermission))
            .add_permission(Arc::new(ExplicitTypePermission::new(["trellis.List", "trellis.Map"])));
        for permission in permissions {
            mapper.add_permission(permission);
        }

        let alias_count = mapper.class_alias_count();
        let mapper = mapper.build(registry.clone())?;

        let mut lookup = ConverterLookup::new();
        register_builtin_converters(&mut lookup);
        let custom = converters.len();
        for (converter, priority) in converters {
            lookup.register(converter, priority);
        }

        debug!(
            types = registry.len(),
            converters = lookup.len(),
            custom_converters = custom,
            aliases = alias_count,
            mode = ?options.reference_mode,
            "Engine configuration frozen"
        );

        let coder = name_coder.unwrap_or_else(|| options.name_coder.coder());
        Ok(Engine::from_parts(registry, mapper, lookup, options, coder))
    }
}

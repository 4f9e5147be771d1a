//! Field-by-field conversion of struct types

use std::sync::Arc;

use ahash::AHashSet;
use tracing::debug;

use super::{unexpected_value, Converter};
use crate::context::{MarshallingContext, UnmarshallingContext};
use crate::error::{ErrorKind, Result};
use crate::mapper::{Mapper, SystemAttribute};
use crate::types::{FieldDescriptor, TypeKey, TypeKind, TypeRegistry};
use crate::value::{ObjectData, ObjectId, Value};

/// Catch-all converter for struct types.
///
/// Fields are visited in layout order, ancestors' fields first. A field is
/// written as an attribute when the mapper asks for it and its value has a
/// single-value converter and needs no type marker; every other non-null
/// field becomes a child node named by the mapper. Transient and omitted
/// fields are skipped. Fields hidden by a same-named field of a subtype
/// carry a `defined-in` attribute naming their declaring type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionConverter;

impl Converter for ReflectionConverter {
    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool {
        matches!(registry.get(ty).kind(), TypeKind::Struct)
    }

    fn marshal(&self, value: &Value, ctx: &mut MarshallingContext<'_>) -> Result<()> {
        let id = value.as_ref().ok_or_else(|| unexpected_value("an object", value))?;
        let graph = ctx.graph();
        let mapper = ctx.mapper();
        let registry = mapper.registry();
        let object = graph.object(id)?;
        let ty = object.ty;
        let values = match &object.data {
            ObjectData::Fields(values) => values,
            _ => return Err(unexpected_value("a struct", value)),
        };

        let mut as_attribute = vec![false; values.len()];
        for (index, (field, field_value)) in registry.get(ty).layout().iter().zip(values).enumerate() {
            if field_value.is_null() || !is_written(mapper, ty, field) || registry.is_shadowed(ty, index) {
                continue;
            }
            let owner = member_owner(registry, ty, index, field);
            let actual = field_value.type_key(graph)?;
            if !mapper.use_attribute_for(owner, &field.name, field.declared) || mapper.needs_type_marker(field.declared, actual) {
                continue;
            }
            let converter = match checked_local_converter(mapper, owner, field, actual)? {
                Some(local) => local,
                None => ctx.converter_for(actual)?,
            };
            if let Some(single) = converter.as_single_value() {
                let text = single.to_text(field_value)?;
                let name = mapper.serialized_member(owner, &field.name);
                ctx.writer().add_attribute(&name, &text)?;
                as_attribute[index] = true;
            }
        }

        for (index, (field, field_value)) in registry.get(ty).layout().iter().zip(values).enumerate() {
            let owner = member_owner(registry, ty, index, field);
            if as_attribute[index] || field_value.is_null() || !is_written(mapper, owner, field) {
                continue;
            }
            if let Some(collection) = mapper.implicit_collection_for_field(owner, &field.name) {
                if let Some(list) = field_value.as_ref() {
                    for item in graph.items(list)? {
                        write_implicit_item(item, collection.item_name.as_deref(), collection.item_type, ctx)?;
                    }
                    continue;
                }
            }

            let actual = field_value.type_key(graph)?;
            let name = mapper.serialized_member(owner, &field.name);
            ctx.writer().start_node(&name)?;
            if registry.is_shadowed(ty, index) {
                if let Some(attribute) = mapper.alias_for_system_attribute(SystemAttribute::DefinedIn) {
                    let declaring = mapper.serialized_class(field.owner);
                    ctx.writer().add_attribute(&attribute, &declaring)?;
                }
            }
            if mapper.needs_type_marker(field.declared, actual) {
                write_class_attribute(actual, ctx)?;
            }
            match mapper.local_converter(owner, &field.name) {
                Some(local) => ctx.convert_another_with(field_value, local.as_ref())?,
                None => ctx.convert_another(field_value)?,
            }
            ctx.writer().end_node()?;
        }
        Ok(())
    }

    fn unmarshal(&self, ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
        let ty = ctx.required_type();
        let mapper = ctx.mapper();
        let registry = mapper.registry();
        let layout = registry.get(ty).layout();
        let id = ctx.instantiate(ty)?;
        let mut seen = AHashSet::new();

        let attributes = ctx.reader().attribute_names();
        for attribute in attributes {
            if mapper.system_attribute_for_alias(&attribute).is_some() {
                continue;
            }
            let member = mapper.real_member(ty, &attribute);
            let Some(index) = registry.field_index(ty, &member) else {
                continue;
            };
            let field = &layout[index];
            if !is_written(mapper, ty, field) {
                continue;
            }
            let actual = mapper.default_implementation_of(field.declared);
            let converter = match checked_local_converter(mapper, ty, field, actual)? {
                Some(local) => local,
                None => ctx.converter_for(actual)?,
            };
            let single = converter.as_single_value().ok_or_else(|| ErrorKind::TypeMismatch {
                expected: "a type with a single-value converter".to_string(),
                found: registry.name(actual).to_string(),
            })?;
            let text = ctx.reader().attribute(&attribute).map(|text| text.into_owned()).unwrap_or_default();
            let value = single.from_text(&text, actual, registry)?;
            check_assignable(registry, value.type_key(ctx.graph())?, field.declared)?;
            ctx.graph_mut().set_field_at(id, index, value)?;
            seen.insert(index);
        }

        while ctx.reader().has_more_children() {
            ctx.reader().move_down()?;
            read_element(ctx, ty, id, &mut seen)?;
            ctx.reader().move_up()?;
        }
        Ok(Value::Ref(id))
    }
}

fn is_written(mapper: &dyn Mapper, owner: TypeKey, field: &FieldDescriptor) -> bool {
    !field.transient && mapper.should_serialize_member(owner, &field.name)
}

/// Type whose configuration applies to a field: the runtime type, or the
/// declaring type for a field hidden by a subtype's field.
fn member_owner(registry: &TypeRegistry, ty: TypeKey, index: usize, field: &FieldDescriptor) -> TypeKey {
    if registry.is_shadowed(ty, index) {
        field.owner
    } else {
        ty
    }
}

/// Fails unless a value of `found` may be stored in a field declared as
/// `declared`. Null fits every field.
fn check_assignable(registry: &TypeRegistry, found: TypeKey, declared: TypeKey) -> Result<()> {
    if found == TypeKey::NULL || registry.is_assignable(found, declared) {
        return Ok(());
    }
    Err(ErrorKind::TypeMismatch {
        expected: registry.name(declared).to_string(),
        found: registry.name(found).to_string(),
    }
    .into())
}

/// Converter fixed for `field`, which must accept values of `ty`.
fn checked_local_converter(
    mapper: &dyn Mapper,
    owner: TypeKey,
    field: &FieldDescriptor,
    ty: TypeKey,
) -> Result<Option<Arc<dyn Converter>>> {
    let Some(converter) = mapper.local_converter(owner, &field.name) else {
        return Ok(None);
    };
    let registry = mapper.registry();
    if !converter.can_convert(ty, registry) {
        return Err(ErrorKind::ConverterMismatch {
            converter: converter.name().to_string(),
            type_name: registry.name(ty).to_string(),
        }
        .into());
    }
    Ok(Some(converter))
}

fn write_class_attribute(actual: TypeKey, ctx: &mut MarshallingContext<'_>) -> Result<()> {
    let mapper = ctx.mapper();
    if let Some(attribute) = mapper.alias_for_system_attribute(SystemAttribute::Class) {
        let name = mapper.serialized_class(actual);
        ctx.writer().add_attribute(&attribute, &name)?;
    }
    Ok(())
}

fn write_implicit_item(
    item: &Value,
    item_name: Option<&str>,
    item_type: Option<TypeKey>,
    ctx: &mut MarshallingContext<'_>,
) -> Result<()> {
    let mapper = ctx.mapper();
    let actual = item.type_key(ctx.graph())?;
    match item_name {
        Some(name) => {
            ctx.writer().start_node(name)?;
            if item_type.map_or(true, |declared| mapper.needs_type_marker(declared, actual)) {
                write_class_attribute(actual, ctx)?;
            }
        }
        None => {
            let name = mapper.serialized_class(actual);
            ctx.writer().start_node(&name)?;
        }
    }
    ctx.convert_another(item)?;
    ctx.writer().end_node()?;
    Ok(())
}

fn read_element(ctx: &mut UnmarshallingContext<'_>, ty: TypeKey, id: ObjectId, seen: &mut AHashSet<usize>) -> Result<()> {
    let mapper = ctx.mapper();
    let registry = mapper.registry();
    let layout = registry.get(ty).layout();
    let element = ctx.reader().node_name().into_owned();

    let defined_in = mapper
        .alias_for_system_attribute(SystemAttribute::DefinedIn)
        .and_then(|attribute| ctx.reader().attribute(&attribute).map(|owner| owner.into_owned()));
    let (owner, index) = match defined_in {
        Some(declaring) => {
            let owner = mapper.real_class(&declaring)?;
            let member = mapper.real_member(owner, &element);
            (owner, registry.field_index_in(ty, owner, &member))
        }
        None => {
            let member = mapper.real_member(ty, &element);
            (ty, registry.field_index(ty, &member))
        }
    };

    if let Some(index) = index {
        let field = &layout[index];
        if mapper.implicit_collection_for_field(owner, &field.name).is_none() {
            if !is_written(mapper, owner, field) {
                return Ok(());
            }
            if !seen.insert(index) {
                return Err(ErrorKind::DuplicateField {
                    type_name: registry.name(ty).to_string(),
                    field: field.name.clone(),
                }
                .into());
            }
            let actual = ctx.field_type(field.declared)?;
            check_assignable(registry, actual, field.declared)?;
            let value = match mapper.local_converter(owner, &field.name) {
                Some(local) if actual != TypeKey::NULL => ctx.convert_another_with(actual, local.as_ref())?,
                _ => ctx.convert_another(actual)?,
            };
            // A back-reference may resolve to an object of any type.
            check_assignable(registry, value.type_key(ctx.graph())?, field.declared)?;
            ctx.graph_mut().set_field_at(id, index, value)?;
            return Ok(());
        }
    }

    let item = match mapper.item_type_for_item_name(ty, &element) {
        Some(declared) => {
            let actual = ctx.field_type(declared)?;
            mapper
                .field_name_for_item(ty, actual, Some(&element))
                .map(|field| (field, actual))
        }
        None => match ctx.node_type() {
            Ok(actual) => mapper.field_name_for_item(ty, actual, None).map(|field| (field, actual)),
            Err(error) if matches!(error.kind(), ErrorKind::ClassResolution { .. }) => None,
            Err(error) => return Err(error),
        },
    };

    match item {
        Some((field, actual)) => {
            let index = registry.field_index(ty, field).ok_or_else(|| ErrorKind::UnknownField {
                type_name: registry.name(ty).to_string(),
                field: field.to_string(),
            })?;
            let list = implicit_list(ctx, id, index, layout[index].declared)?;
            let value = ctx.convert_another(actual)?;
            ctx.graph_mut().push_item(list, value)?;
            Ok(())
        }
        None if mapper.is_ignored_element(&element) => {
            debug!(element = %element, type_name = registry.name(ty), "ignoring unknown element");
            Ok(())
        }
        None => Err(ErrorKind::UnknownField {
            type_name: registry.name(ty).to_string(),
            field: element,
        }
        .into()),
    }
}

/// List stored in the implicit collection field at `index`, created on first use.
fn implicit_list(ctx: &mut UnmarshallingContext<'_>, id: ObjectId, index: usize, declared: TypeKey) -> Result<ObjectId> {
    if let Some(list) = ctx.graph().field_at(id, index)?.as_ref() {
        return Ok(list);
    }
    let registry = ctx.registry();
    let implementation = ctx.mapper().default_implementation_of(declared);
    let list_type = match registry.get(implementation).kind() {
        TypeKind::List if registry.get(implementation).is_instantiable() => implementation,
        _ => TypeKey::LIST,
    };
    let list = ctx.graph_mut().create(registry, list_type)?;
    ctx.graph_mut().set_field_at(id, index, Value::Ref(list))?;
    Ok(list)
}

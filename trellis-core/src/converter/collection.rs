//! List and map converters

use super::{unexpected_value, Converter};
use crate::context::{MarshallingContext, UnmarshallingContext};
use crate::error::Result;
use crate::types::{TypeKey, TypeKind, TypeRegistry};
use crate::value::Value;

const ENTRY: &str = "entry";

/// Write `value` as a child node named after its type.
pub(crate) fn write_item(value: &Value, ctx: &mut MarshallingContext<'_>) -> Result<()> {
    let ty = value.type_key(ctx.graph())?;
    let name = ctx.mapper().serialized_class(ty);
    ctx.writer().start_node(&name)?;
    ctx.convert_another(value)?;
    ctx.writer().end_node()?;
    Ok(())
}

/// Read the child node the reader is on, typed by its class attribute or name.
pub(crate) fn read_item(ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
    let ty = ctx.node_type()?;
    ctx.convert_another(ty)
}

/// Lists: one child node per item, named after the item's type.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionConverter;

impl Converter for CollectionConverter {
    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool {
        matches!(registry.get(ty).kind(), TypeKind::List)
    }

    fn marshal(&self, value: &Value, ctx: &mut MarshallingContext<'_>) -> Result<()> {
        let id = value.as_ref().ok_or_else(|| unexpected_value("a list", value))?;
        for item in ctx.graph().items(id)? {
            write_item(item, ctx)?;
        }
        Ok(())
    }

    fn unmarshal(&self, ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
        let id = ctx.instantiate(ctx.required_type())?;
        while ctx.reader().has_more_children() {
            ctx.reader().move_down()?;
            let item = read_item(ctx)?;
            ctx.reader().move_up()?;
            ctx.graph_mut().push_item(id, item)?;
        }
        Ok(Value::Ref(id))
    }
}

/// Maps: one `entry` node per entry holding the key node and the value node.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapConverter;

impl Converter for MapConverter {
    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool {
        matches!(registry.get(ty).kind(), TypeKind::Map)
    }

    fn marshal(&self, value: &Value, ctx: &mut MarshallingContext<'_>) -> Result<()> {
        let id = value.as_ref().ok_or_else(|| unexpected_value("a map", value))?;
        for (key, entry_value) in ctx.graph().entries(id)? {
            ctx.writer().start_node(ENTRY)?;
            write_item(key, ctx)?;
            write_item(entry_value, ctx)?;
            ctx.writer().end_node()?;
        }
        Ok(())
    }

    fn unmarshal(&self, ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
        let id = ctx.instantiate(ctx.required_type())?;
        while ctx.reader().has_more_children() {
            ctx.reader().move_down()?;

            ctx.reader().move_down()?;
            let key = read_item(ctx)?;
            ctx.reader().move_up()?;

            ctx.reader().move_down()?;
            let entry_value = read_item(ctx)?;
            ctx.reader().move_up()?;

            ctx.reader().move_up()?;
            ctx.graph_mut().put_entry(id, key, entry_value)?;
        }
        Ok(Value::Ref(id))
    }
}

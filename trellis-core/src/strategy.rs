//! Top-level marshalling entry points
//!
//! One call converts one root value. The root node is named after the root's
//! type; everything below it is written by converters through a fresh
//! context, so no state survives between calls.

use tracing::debug_span;
use trellis_stream::{HierarchicalStreamReader, HierarchicalStreamWriter};

use crate::context::{MarshallingContext, UnmarshallingContext};
use crate::converter::ConverterLookup;
use crate::error::{ErrorKind, Result};
use crate::mapper::Mapper;
use crate::reference::ReferenceMode;
use crate::types::TypeKey;
use crate::value::{Graph, Value};

/// Write `root` from `graph` to `writer` as a single root node.
pub fn marshal(
    writer: &mut dyn HierarchicalStreamWriter,
    graph: &Graph,
    root: &Value,
    lookup: &ConverterLookup,
    mapper: &dyn Mapper,
    mode: ReferenceMode,
) -> Result<()> {
    let span = debug_span!("marshal", mode = ?mode, objects = graph.len());
    let _enter = span.enter();

    let ty = root.type_key(graph)?;
    let name = mapper.serialized_class(ty);
    let mut ctx = MarshallingContext::new(writer, graph, lookup, mapper, mode);
    ctx.writer().start_node(&name)?;
    ctx.convert_another(root)?;
    ctx.writer().end_node()?;
    ctx.writer().flush()?;
    Ok(())
}

/// Read one root value from `reader`, which must be positioned on the root node.
///
/// When `expected` is given, the root's type must be assignable to it. The
/// graph is returned only if the whole stream was read successfully.
pub fn unmarshal(
    reader: &mut dyn HierarchicalStreamReader,
    expected: Option<TypeKey>,
    lookup: &ConverterLookup,
    mapper: &dyn Mapper,
    mode: ReferenceMode,
) -> Result<(Graph, Value)> {
    let span = debug_span!("unmarshal", mode = ?mode);
    let _enter = span.enter();

    let mut ctx = UnmarshallingContext::new(reader, lookup, mapper, mode);
    let ty = ctx.node_type()?;
    if let Some(expected) = expected {
        let registry = mapper.registry();
        if !registry.is_assignable(ty, expected) {
            return Err(ErrorKind::TypeMismatch {
                expected: registry.name(expected).to_string(),
                found: registry.name(ty).to_string(),
            }
            .into());
        }
    }
    let root = ctx.convert_another(ty)?;
    let graph = ctx.finish()?;
    Ok((graph, root))
}

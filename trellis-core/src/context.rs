//! Marshalling and unmarshalling contexts
//!
//! A context lives for one top-level conversion. It owns the stream cursor
//! (wrapped in a path tracker), the reference table and the stack of objects
//! being converted, and it is the only way a converter reaches nested
//! values: [`MarshallingContext::convert_another`] and
//! [`UnmarshallingContext::convert_another`] consult the reference table,
//! pick a converter and annotate any failure with the stream position.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::trace;
use trellis_stream::{HierarchicalStreamReader, HierarchicalStreamWriter, Path, PathTrackingReader, PathTrackingWriter};

use crate::converter::{Converter, ConverterLookup, PrioritizedList};
use crate::error::{ConversionError, ErrorKind, Result};
use crate::mapper::{Mapper, SystemAttribute};
use crate::reference::{ReadReferences, ReferenceKey, ReferenceMode, WriteReferences};
use crate::types::{TypeKey, TypeRegistry};
use crate::value::{Graph, ObjectId, ObjectState, Value};

/// Work run once the whole graph has been read.
pub type CompletionCallback<'a> = Box<dyn FnOnce(&mut Graph) -> Result<()> + 'a>;

fn disabled_attribute(attribute: SystemAttribute) -> ConversionError {
    ErrorKind::InvalidConfiguration(format!(
        "system attribute '{}' is disabled but required by the reference mode",
        attribute.default_name()
    ))
    .into()
}

/// State of one marshalling call.
pub struct MarshallingContext<'a> {
    writer: PathTrackingWriter<&'a mut dyn HierarchicalStreamWriter>,
    graph: &'a Graph,
    lookup: &'a ConverterLookup,
    mapper: &'a dyn Mapper,
    references: WriteReferences,
    object_stack: Vec<ObjectId>,
}

impl<'a> MarshallingContext<'a> {
    /// Context writing `graph` to `writer`.
    pub fn new(
        writer: &'a mut dyn HierarchicalStreamWriter,
        graph: &'a Graph,
        lookup: &'a ConverterLookup,
        mapper: &'a dyn Mapper,
        mode: ReferenceMode,
    ) -> Self {
        Self {
            writer: PathTrackingWriter::new(writer),
            graph,
            lookup,
            mapper,
            references: WriteReferences::new(mode),
            object_stack: Vec::new(),
        }
    }

    /// Stream the current node is written to.
    pub fn writer(&mut self) -> &mut dyn HierarchicalStreamWriter {
        &mut self.writer
    }

    /// Graph being written.
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// Mapper chain.
    pub fn mapper(&self) -> &'a dyn Mapper {
        self.mapper
    }

    /// Type registry.
    pub fn registry(&self) -> &'a TypeRegistry {
        let mapper: &'a dyn Mapper = self.mapper;
        mapper.registry()
    }

    /// Converter for values of `ty`.
    pub fn converter_for(&self, ty: TypeKey) -> Result<Arc<dyn Converter>> {
        self.lookup.lookup(ty, self.registry())
    }

    /// Absolute path of the node currently open.
    pub fn current_path(&self) -> Path {
        self.writer.current_path()
    }

    /// Objects whose conversion is in progress, outermost first.
    pub fn object_stack(&self) -> &[ObjectId] {
        &self.object_stack
    }

    /// Write `value` into the current node with the converter the lookup picks.
    pub fn convert_another(&mut self, value: &Value) -> Result<()> {
        let ty = value.type_key(self.graph)?;
        let converter = self.converter_for(ty).map_err(|error| self.annotate(error, ty, None))?;
        self.convert(value, ty, converter.as_ref())
    }

    /// Write `value` into the current node with `converter`.
    pub fn convert_another_with(&mut self, value: &Value, converter: &dyn Converter) -> Result<()> {
        let ty = value.type_key(self.graph)?;
        if !converter.can_convert(ty, self.registry()) {
            let error = ErrorKind::ConverterMismatch {
                converter: converter.name().to_string(),
                type_name: self.registry().name(ty).to_string(),
            };
            return Err(self.annotate(error.into(), ty, None));
        }
        self.convert(value, ty, converter)
    }

    fn convert(&mut self, value: &Value, ty: TypeKey, converter: &dyn Converter) -> Result<()> {
        self.track(value, ty, converter)
            .map_err(|error| self.annotate(error, ty, Some(converter.name())))
    }

    fn track(&mut self, value: &Value, ty: TypeKey, converter: &dyn Converter) -> Result<()> {
        let id = match value.as_ref() {
            Some(id) if !self.mapper.is_immutable_value_type(ty) => id,
            _ => return converter.marshal(value, self),
        };

        if self.references.mode().tracks_references() {
            let current = self.writer.current_path();
            if let Some(key) = self.references.lookup(id) {
                let marker = self.references.marker(key, &current);
                let attribute = self
                    .mapper
                    .alias_for_system_attribute(SystemAttribute::Reference)
                    .ok_or_else(|| disabled_attribute(SystemAttribute::Reference))?;
                trace!(object = %id, marker = %marker, "writing back-reference");
                self.writer.add_attribute(&attribute, &marker)?;
                return Ok(());
            }
            if let ReferenceKey::Id(marker) = self.references.register(id, &current) {
                let attribute = self
                    .mapper
                    .alias_for_system_attribute(SystemAttribute::Id)
                    .ok_or_else(|| disabled_attribute(SystemAttribute::Id))?;
                self.writer.add_attribute(&attribute, &marker)?;
            }
        } else if self.object_stack.contains(&id) {
            return Err(ErrorKind::Circularity {
                type_name: self.registry().name(ty).to_string(),
            }
            .into());
        }

        self.object_stack.push(id);
        let result = converter.marshal(value, self);
        self.object_stack.pop();
        result
    }

    fn annotate(&self, error: ConversionError, ty: TypeKey, converter: Option<&str>) -> ConversionError {
        let error = error
            .with_context("path", self.current_path().to_string())
            .with_context("type", self.registry().name(ty));
        match converter {
            Some(name) => error.with_context("converter", name),
            None => error,
        }
    }
}

struct Frame {
    required: TypeKey,
    key: Option<ReferenceKey>,
    object: Option<ObjectId>,
}

/// State of one unmarshalling call. Owns the graph being built.
pub struct UnmarshallingContext<'a> {
    reader: PathTrackingReader<&'a mut dyn HierarchicalStreamReader>,
    graph: Graph,
    lookup: &'a ConverterLookup,
    mapper: &'a dyn Mapper,
    references: ReadReferences,
    frames: Vec<Frame>,
    callbacks: PrioritizedList<CompletionCallback<'a>>,
}

impl<'a> UnmarshallingContext<'a> {
    /// Context reading from `reader`, positioned on the root node.
    pub fn new(
        reader: &'a mut dyn HierarchicalStreamReader,
        lookup: &'a ConverterLookup,
        mapper: &'a dyn Mapper,
        mode: ReferenceMode,
    ) -> Self {
        Self {
            reader: PathTrackingReader::new(reader),
            graph: Graph::new(),
            lookup,
            mapper,
            references: ReadReferences::new(mode),
            frames: Vec::new(),
            callbacks: PrioritizedList::new(),
        }
    }

    /// Stream positioned on the current node.
    pub fn reader(&mut self) -> &mut dyn HierarchicalStreamReader {
        &mut self.reader
    }

    /// Graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the graph built so far.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Mapper chain.
    pub fn mapper(&self) -> &'a dyn Mapper {
        self.mapper
    }

    /// Type registry.
    pub fn registry(&self) -> &'a TypeRegistry {
        let mapper: &'a dyn Mapper = self.mapper;
        mapper.registry()
    }

    /// Converter for values of `ty`.
    pub fn converter_for(&self, ty: TypeKey) -> Result<Arc<dyn Converter>> {
        self.lookup.lookup(ty, self.registry())
    }

    /// Absolute path of the current node.
    pub fn current_path(&self) -> Path {
        self.reader.current_path()
    }

    /// Type the running converter was asked to produce.
    pub fn required_type(&self) -> TypeKey {
        self.frames.last().map_or(TypeKey::OBJECT, |frame| frame.required)
    }

    /// Object instantiated by the running converter, if any.
    pub fn current_object(&self) -> Option<ObjectId> {
        self.frames.last().and_then(|frame| frame.object)
    }

    /// Objects whose conversion is in progress, outermost first.
    pub fn object_stack(&self) -> Vec<ObjectId> {
        self.frames.iter().filter_map(|frame| frame.object).collect()
    }

    /// Value of the class attribute on the current node.
    pub fn class_attribute(&self) -> Option<String> {
        let attribute = self.mapper.alias_for_system_attribute(SystemAttribute::Class)?;
        self.reader.attribute(&attribute).map(Cow::into_owned)
    }

    /// Type of an item node: its class attribute, or else its name.
    pub fn node_type(&self) -> Result<TypeKey> {
        match self.class_attribute() {
            Some(name) => self.mapper.real_class(&name),
            None => self.mapper.real_class(&self.reader.node_name()),
        }
    }

    /// Type of a field node declared as `declared`: its class attribute, or
    /// else the default implementation of the declaration.
    pub fn field_type(&self, declared: TypeKey) -> Result<TypeKey> {
        match self.class_attribute() {
            Some(name) => self.mapper.real_class(&name),
            None => Ok(self.mapper.default_implementation_of(declared)),
        }
    }

    /// Read a value of `required` from the current node, or resolve the
    /// back-reference it carries.
    pub fn convert_another(&mut self, required: TypeKey) -> Result<Value> {
        if let Some(value) = self.resolve_reference()? {
            return Ok(value);
        }
        let converter = self
            .converter_for(required)
            .map_err(|error| self.annotate(error, required, None))?;
        self.convert(required, converter.as_ref())
    }

    /// Read a value of `required` from the current node with `converter`.
    pub fn convert_another_with(&mut self, required: TypeKey, converter: &dyn Converter) -> Result<Value> {
        if !converter.can_convert(required, self.registry()) {
            let error = ErrorKind::ConverterMismatch {
                converter: converter.name().to_string(),
                type_name: self.registry().name(required).to_string(),
            };
            return Err(self.annotate(error.into(), required, None));
        }
        if let Some(value) = self.resolve_reference()? {
            return Ok(value);
        }
        self.convert(required, converter)
    }

    /// Allocate the object the running converter produces.
    ///
    /// The object is registered for back-references at once, so references
    /// inside its own subtree resolve to it while it is still under
    /// construction.
    pub fn instantiate(&mut self, ty: TypeKey) -> Result<ObjectId> {
        let registry = self.registry();
        let id = self.graph.allocate(registry, ty, ObjectState::UnderConstruction)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.object = Some(id);
            if let Some(key) = frame.key.clone() {
                self.references.register(key, Value::Ref(id));
            }
        }
        Ok(id)
    }

    /// Run `callback` after the whole graph is read. Higher priorities run
    /// first; equal priorities run newest first.
    pub fn add_completion_callback<F>(&mut self, priority: i32, callback: F)
    where
        F: FnOnce(&mut Graph) -> Result<()> + 'a,
    {
        self.callbacks.add(Box::new(callback), priority);
    }

    /// Run the completion callbacks and hand out the graph.
    pub fn finish(self) -> Result<Graph> {
        let UnmarshallingContext {
            mut graph, callbacks, ..
        } = self;
        for callback in callbacks {
            callback(&mut graph)?;
        }
        Ok(graph)
    }

    fn resolve_reference(&self) -> Result<Option<Value>> {
        if !self.references.mode().tracks_references() {
            return Ok(None);
        }
        let Some(attribute) = self.mapper.alias_for_system_attribute(SystemAttribute::Reference) else {
            return Ok(None);
        };
        let Some(marker) = self.reader.attribute(&attribute) else {
            return Ok(None);
        };
        let current = self.reader.current_path();
        let key = self.references.key_for_marker(&marker, &current);
        trace!(marker = %marker, "resolving back-reference");
        match self.references.get(&key) {
            Some(value) => Ok(Some(value.clone())),
            None => Err(ConversionError::from(ErrorKind::UnresolvedReference {
                reference: marker.into_owned(),
            })
            .with_context("path", current.to_string())),
        }
    }

    fn reference_key(&self, required: TypeKey) -> Option<ReferenceKey> {
        if self.mapper.is_immutable_value_type(required) {
            return None;
        }
        match self.references.mode() {
            ReferenceMode::NoReferences => None,
            ReferenceMode::Id => {
                let attribute = self.mapper.alias_for_system_attribute(SystemAttribute::Id)?;
                self.reader
                    .attribute(&attribute)
                    .map(|id| ReferenceKey::Id(id.into_owned()))
            }
            ReferenceMode::RelativePath | ReferenceMode::AbsolutePath => {
                Some(ReferenceKey::Path(self.reader.current_path()))
            }
        }
    }

    fn convert(&mut self, required: TypeKey, converter: &dyn Converter) -> Result<Value> {
        let key = self.reference_key(required);
        self.frames.push(Frame {
            required,
            key,
            object: None,
        });
        let result = converter.unmarshal(self);
        let frame = self.frames.pop();
        let value = result.map_err(|error| self.annotate(error, required, Some(converter.name())))?;

        if let (Some(frame), Value::Ref(id)) = (frame, &value) {
            if frame.object == Some(*id) {
                self.graph.mark_complete(*id)?;
            }
            if let Some(key) = frame.key {
                self.references.register(key, value.clone());
            }
        }
        Ok(value)
    }

    fn annotate(&self, error: ConversionError, required: TypeKey, converter: Option<&str>) -> ConversionError {
        let error = error
            .with_context("path", self.current_path().to_string())
            .with_context("required-type", self.registry().name(required));
        match converter {
            Some(name) => error.with_context("converter", name),
            None => error,
        }
    }
}

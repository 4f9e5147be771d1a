//! Frozen conversion engine

use std::fmt;
use std::sync::Arc;

use trellis_core::{strategy, ConverterLookup, Graph, Mapper, Result, TypeKey, TypeRegistry, Value};
use trellis_stream::{HierarchicalStreamReader, HierarchicalStreamWriter, NameCoder, Node, TreeReader, TreeWriter};

use crate::builder::EngineBuilder;
use crate::options::EngineOptions;

/// Graph read back from a stream
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Every object created while reading
    pub graph: Graph,
    /// Root value, usually a reference into `graph`
    pub root: Value,
}

impl Decoded {
    /// Split into graph and root.
    pub fn into_parts(self) -> (Graph, Value) {
        (self.graph, self.root)
    }
}

struct EngineInner {
    registry: Arc<TypeRegistry>,
    mapper: Box<dyn Mapper>,
    lookup: ConverterLookup,
    options: EngineOptions,
    coder: Arc<dyn NameCoder>,
}

/// Configured engine converting graphs to and from node streams
///
/// Cloning is cheap and clones share all configuration and caches. An engine
/// can be used from any number of threads at once; every call works on its
/// own context and reference table.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.inner.registry.len())
            .field("converters", &self.inner.lookup.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Engine {
    /// Start configuring an engine over `registry`.
    pub fn builder(registry: impl Into<Arc<TypeRegistry>>) -> EngineBuilder {
        EngineBuilder::new(registry)
    }

    pub(crate) fn from_parts(
        registry: Arc<TypeRegistry>,
        mapper: Box<dyn Mapper>,
        lookup: ConverterLookup,
        options: EngineOptions,
        coder: Arc<dyn NameCoder>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry,
                mapper,
                lookup,
                options,
                coder,
            }),
        }
    }

    /// Types known to this engine.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    /// Outermost layer of the mapper chain.
    pub fn mapper(&self) -> &dyn Mapper {
        self.inner.mapper.as_ref()
    }

    /// Converters in lookup order.
    pub fn converters(&self) -> &ConverterLookup {
        &self.inner.lookup
    }

    /// Options the engine was built with.
    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Write `root` to an arbitrary stream driver.
    pub fn marshal(&self, writer: &mut dyn HierarchicalStreamWriter, graph: &Graph, root: &Value) -> Result<()> {
        strategy::marshal(
            writer,
            graph,
            root,
            &self.inner.lookup,
            self.mapper(),
            self.inner.options.reference_mode,
        )
    }

    /// Read one root value from an arbitrary stream driver positioned on the
    /// root node.
    ///
    /// When `expected` is given, the root's type must be assignable to it.
    pub fn unmarshal(&self, reader: &mut dyn HierarchicalStreamReader, expected: Option<TypeKey>) -> Result<Decoded> {
        let (graph, root) = strategy::unmarshal(
            reader,
            expected,
            &self.inner.lookup,
            self.mapper(),
            self.inner.options.reference_mode,
        )?;
        Ok(Decoded { graph, root })
    }

    /// Convert `root` into a node tree.
    pub fn serialize(&self, graph: &Graph, root: &Value) -> Result<Node> {
        let mut writer = TreeWriter::with_name_coder(self.inner.coder.clone());
        self.marshal(&mut writer, graph, root)?;
        Ok(writer.into_root()?)
    }

    /// Rebuild a graph from a node tree.
    pub fn deserialize(&self, node: &Node, expected: Option<TypeKey>) -> Result<Decoded> {
        let mut reader = TreeReader::with_name_coder(node, self.inner.coder.clone());
        self.unmarshal(&mut reader, expected)
    }

    /// Convert `root` into the JSON rendering of its node tree.
    pub fn to_json(&self, graph: &Graph, root: &Value) -> Result<String> {
        Ok(self.serialize(graph, root)?.to_json()?)
    }

    /// Rebuild a graph from the JSON rendering of a node tree.
    pub fn from_json(&self, json: &str, expected: Option<TypeKey>) -> Result<Decoded> {
        let node = Node::from_json(json)?;
        self.deserialize(&node, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{ErrorKind, TypeDef};

    fn engine() -> Engine {
        let registry = TypeRegistry::builder()
            .register(
                TypeDef::structure("acme.Person")
                    .field("first_name", "trellis.String")
                    .field("age", "trellis.Int"),
            )
            .build()
            .unwrap();
        Engine::builder(registry)
            .alias("person", "acme.Person")
            .allow_types(["acme.Person"])
            .build()
            .unwrap()
    }

    fn person(engine: &Engine) -> (Graph, Value) {
        let registry = engine.registry();
        let mut graph = Graph::new();
        let id = graph.create(registry, registry.lookup("acme.Person").unwrap()).unwrap();
        graph.set_field(registry, id, "first_name", "Ada").unwrap();
        graph.set_field(registry, id, "age", 36).unwrap();
        (graph, Value::Ref(id))
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_shareable() {
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_serialize_applies_name_coder() {
        let engine = engine();
        let (graph, root) = person(&engine);
        let node = engine.serialize(&graph, &root).unwrap();
        assert_eq!(node.name, "person");
        assert_eq!(node.child("first__name").unwrap().text(), "Ada");

        let decoded = engine.deserialize(&node, None).unwrap();
        assert!(graph.equivalent(&root, &decoded.graph, &decoded.root));
    }

    #[test]
    fn test_json_round_trip() {
        let engine = engine();
        let (graph, root) = person(&engine);
        let json = engine.to_json(&graph, &root).unwrap();
        let (read_graph, read_root) = engine.from_json(&json, None).unwrap().into_parts();
        assert!(graph.equivalent(&root, &read_graph, &read_root));
    }

    #[test]
    fn test_malformed_json() {
        let error = engine().from_json("{\"name\": ", None).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::Stream(_)));
    }

    #[test]
    fn test_expected_root_type() {
        let engine = engine();
        let (graph, root) = person(&engine);
        let node = engine.serialize(&graph, &root).unwrap();
        let error = engine.deserialize(&node, Some(TypeKey::STRING)).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::TypeMismatch { .. }));
        assert!(engine.deserialize(&node, Some(TypeKey::OBJECT)).is_ok());
    }
}

//! Trellis Test Utilities
//!
//! Shared fixtures and helpers for the Trellis integration tests:
//!
//! - [`fixtures`] with ready-made type registries
//! - [`GraphBuilder`] for assembling object graphs tersely
//! - [`tree`] for locating and rendering nodes in written trees

use trellis_core::{Graph, ObjectId, TypeKey, TypeRegistry, Value};

pub mod fixtures;
pub mod tree;

/// Install a subscriber that routes engine logs through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Builder for test graphs
///
/// Every method panics on invalid input, which is what a test wants.
pub struct GraphBuilder<'r> {
    registry: &'r TypeRegistry,
    graph: Graph,
}

impl<'r> GraphBuilder<'r> {
    /// Create an empty graph over `registry`.
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            graph: Graph::new(),
        }
    }

    fn key(&self, type_name: &str) -> TypeKey {
        self.registry
            .lookup(type_name)
            .unwrap_or_else(|| panic!("type '{}' is not registered", type_name))
    }

    /// Create an object of `type_name` and set the given fields.
    pub fn object(&mut self, type_name: &str, fields: &[(&str, Value)]) -> ObjectId {
        let id = self
            .graph
            .create(self.registry, self.key(type_name))
            .expect("create object");
        for (name, value) in fields {
            self.set(id, name, value.clone());
        }
        id
    }

    /// Create a list of `type_name` holding `items`.
    pub fn list(&mut self, type_name: &str, items: impl IntoIterator<Item = Value>) -> ObjectId {
        let id = self
            .graph
            .create(self.registry, self.key(type_name))
            .expect("create list");
        for item in items {
            self.push(id, item);
        }
        id
    }

    /// Create a map of `type_name` holding `entries`.
    pub fn map(&mut self, type_name: &str, entries: impl IntoIterator<Item = (Value, Value)>) -> ObjectId {
        let id = self
            .graph
            .create(self.registry, self.key(type_name))
            .expect("create map");
        for (key, value) in entries {
            self.graph.put_entry(id, key, value).expect("put entry");
        }
        id
    }

    /// Set field `name` of object `id`.
    pub fn set(&mut self, id: ObjectId, name: &str, value: impl Into<Value>) -> &mut Self {
        self.graph
            .set_field(self.registry, id, name, value)
            .unwrap_or_else(|err| panic!("set field '{}': {}", name, err));
        self
    }

    /// Append `value` to list `id`.
    pub fn push(&mut self, id: ObjectId, value: impl Into<Value>) -> &mut Self {
        self.graph.push_item(id, value).expect("push item");
        self
    }

    /// The graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Finish building.
    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Enum value of `type_name` in `registry`.
pub fn variant(registry: &TypeRegistry, type_name: &str, variant: &str) -> Value {
    let ty = registry
        .lookup(type_name)
        .unwrap_or_else(|| panic!("type '{}' is not registered", type_name));
    Value::Enum(trellis_core::EnumValue {
        ty,
        variant: variant.to_string(),
    })
}

//! Trellis - Object-graph serialization onto hierarchical node streams
//!
//! This crate is the entry point for applications:
//!
//! - [`EngineBuilder`] for aliases, converters, type permissions and options
//! - [`Engine`] for thread-safe conversion of graphs to node trees, JSON and
//!   arbitrary stream drivers, and back
//! - [`EngineOptions`] for the declarative settings, loadable from JSON
//!
//! Identity is preserved: shared objects are written once and referenced
//! afterwards, so cycles and aliasing survive a round trip.
//!
//! ```
//! use trellis::Engine;
//! use trellis_core::{Graph, TypeDef, TypeRegistry, Value};
//!
//! let registry = TypeRegistry::builder()
//!     .register(TypeDef::structure("acme.Node").field("label", "trellis.String").field("next", "acme.Node"))
//!     .build()
//!     .unwrap();
//! let engine = Engine::builder(registry).alias("node", "acme.Node").allow_types(["acme.Node"]).build().unwrap();
//!
//! let registry = engine.registry();
//! let mut graph = Graph::new();
//! let node = graph.create(registry, registry.lookup("acme.Node").unwrap()).unwrap();
//! graph.set_field(registry, node, "label", "loop").unwrap();
//! graph.set_field(registry, node, "next", node).unwrap();
//!
//! let tree = engine.serialize(&graph, &Value::Ref(node)).unwrap();
//! assert_eq!(tree.child("next").unwrap().attribute("reference"), Some("1"));
//!
//! let decoded = engine.deserialize(&tree, None).unwrap();
//! assert!(graph.equivalent(&Value::Ref(node), &decoded.graph, &decoded.root));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod engine;
pub mod options;

// Re-export commonly used types
pub use builder::{EngineBuilder, DEFAULT_ALIASES};
pub use engine::{Decoded, Engine};
pub use options::{EngineOptions, NameCoderChoice};
pub use trellis_core::{ConversionError, ErrorKind, Graph, Priority, ReferenceMode, Result, TypeKey, Value};
pub use trellis_stream::Node;

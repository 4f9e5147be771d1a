//! Trellis Core - Object-graph conversion engine
//!
//! This crate turns object graphs into hierarchical node streams and back:
//!
//! - A frozen type registry describing structs, lists, maps, enums and
//!   primitives
//! - An arena graph with explicit object identity and construction state
//! - The layered mapper chain deciding names, attributes and defaults
//! - Converters and priority-ordered converter lookup
//! - Reference tracking by id or path, and cycle detection
//! - Type permissions guarding type resolution from stream content

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod converter;
pub mod error;
pub mod mapper;
pub mod reference;
pub mod security;
pub mod strategy;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use context::{CompletionCallback, MarshallingContext, UnmarshallingContext};
pub use converter::{
    register_builtin_converters, Converter, ConverterLookup, Priority, PrioritizedList, SingleValueConverter,
    SingleValueConverterWrapper,
};
pub use error::{ConversionError, ErrorKind, Result};
pub use mapper::{ImplicitCollection, Mapper, MapperChainBuilder, MapperLayer, SystemAttribute};
pub use reference::{ReferenceKey, ReferenceMode};
pub use security::{TypePermission, Verdict};
pub use types::{FieldDescriptor, PrimitiveKind, TypeDef, TypeDescriptor, TypeKey, TypeKind, TypeRegistry, TypeRegistryBuilder};
pub use value::{EnumValue, Graph, Object, ObjectData, ObjectId, ObjectState, Value};

// Stream primitives used throughout the public API
pub use trellis_stream::{HierarchicalStreamReader, HierarchicalStreamWriter, Path, StreamError};

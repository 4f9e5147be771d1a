//! Trellis Stream - Hierarchical stream primitives
//!
//! This crate provides the node-oriented stream contract that every Trellis
//! format driver implements, with no dependency on the serialization engine.
//! It includes:
//!
//! - Writer and reader traits for nested, named nodes
//! - Name coders translating logical names to format-safe names
//! - Node paths and path tracking for reference resolution
//! - An in-memory tree driver with JSON persistence
//! - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod name_coder;
pub mod path;
pub mod path_tracker;
pub mod reader;
pub mod tree;
pub mod writer;

// Re-export commonly used types
pub use error::{Result, StreamError};
pub use name_coder::{NameCoder, NoNameCoder, StaticNameCoder, XmlFriendlyNameCoder};
pub use path::Path;
pub use path_tracker::{PathTracker, PathTrackingReader, PathTrackingWriter};
pub use reader::HierarchicalStreamReader;
pub use tree::{Node, TreeReader, TreeWriter};
pub use writer::HierarchicalStreamWriter;

//! Error types for hierarchical streams

use thiserror::Error;

/// Structural stream errors
///
/// Raised when a driver is used outside the node protocol (unbalanced
/// `start_node`/`end_node`, attributes written after content, cursor moved
/// past the tree) or when a stream is malformed.
#[derive(Debug, Error)]
pub enum StreamError {
    /// `end_node` was called without a matching `start_node`.
    #[error("Unbalanced end_node: no open node to close")]
    UnbalancedEnd,
    /// Content was written while no node was open.
    #[error("No open node to write {content} into")]
    NoOpenNode {
        /// What the caller tried to write
        content: &'static str,
    },
    /// The writer was finished while nodes were still open.
    #[error("Unclosed nodes: {depth} node(s) still open, innermost '{node}'")]
    UnclosedNodes {
        /// Number of nodes still open
        depth: usize,
        /// Name of the innermost open node
        node: String,
    },
    /// A second root node was started.
    #[error("Multiple root nodes: '{node}' started after the root was closed")]
    MultipleRoots {
        /// Name of the rejected node
        node: String,
    },
    /// The writer was finished without producing a root node.
    #[error("No root node written")]
    NoRoot,
    /// `add_attribute` was called after a value or child was written, or with no open node.
    #[error("Attribute '{name}' must be added directly after start_node")]
    AttributeOutOfPlace {
        /// Attribute name
        name: String,
    },
    /// Text and child nodes were mixed within one node.
    #[error("Mixed content in node '{node}': text and child nodes are exclusive")]
    MixedContent {
        /// Node holding both text and children
        node: String,
    },
    /// `move_down` was called with no remaining children.
    #[error("No more children below node '{node}'")]
    NoMoreChildren {
        /// Node whose children are exhausted
        node: String,
    },
    /// `move_up` was called on the root node.
    #[error("Cannot move up from the root node")]
    AtRoot,
    /// JSON rendering or parsing of a tree failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StreamError>;

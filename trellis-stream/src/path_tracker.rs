//! Path tracking over hierarchical streams
//!
//! [`PathTracker`] keeps the stack of currently open nodes together with the
//! sibling index of each, so the absolute [`Path`] of the current node is
//! available at any point during a traversal. The writer and reader wrappers
//! feed a tracker from the node events passing through them.

use std::borrow::Cow;

use ahash::AHashMap;

use crate::error::Result;
use crate::path::Path;
use crate::reader::HierarchicalStreamReader;
use crate::writer::HierarchicalStreamWriter;

/// Stack of open nodes with per-parent sibling counters.
#[derive(Debug, Clone)]
pub struct PathTracker {
    names: Vec<String>,
    indices: Vec<usize>,
    // counts[d] counts children seen so far below the node at depth d;
    // counts[0] belongs to the virtual parent of the root.
    counts: Vec<AHashMap<String, usize>>,
}

impl Default for PathTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTracker {
    /// Create an empty tracker positioned above the root.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            indices: Vec::new(),
            counts: vec![AHashMap::new()],
        }
    }

    /// Record entry into a child node named `name`.
    pub fn push_element(&mut self, name: &str) {
        let index = match self.counts.last_mut() {
            Some(siblings) => {
                let count = siblings.entry(name.to_string()).or_insert(0);
                *count += 1;
                *count
            }
            None => 1,
        };

        self.names.push(name.to_string());
        self.indices.push(index);
        self.counts.push(AHashMap::new());
    }

    /// Record leaving the current node. Sibling counters of its children are discarded.
    pub fn pop_element(&mut self) {
        if self.names.pop().is_some() {
            self.indices.pop();
            self.counts.pop();
        }
    }

    /// Number of open nodes.
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// Name of the current node, without index selector.
    pub fn current_name(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// Chunk of the node `level` steps above the current one (0 is the current node),
    /// including its index selector when it is not the first of its name.
    pub fn peek_element(&self, level: usize) -> Option<String> {
        let position = self.names.len().checked_sub(level + 1)?;
        Some(self.chunk(position))
    }

    /// Absolute path of the current node.
    pub fn path(&self) -> Path {
        Path::from_chunks(
            std::iter::once(String::new()).chain((0..self.names.len()).map(|i| self.chunk(i))),
        )
    }

    fn chunk(&self, position: usize) -> String {
        let name = &self.names[position];
        match self.indices[position] {
            index if index > 1 => format!("{}[{}]", name, index),
            _ => name.clone(),
        }
    }
}

/// Writer wrapper keeping a [`PathTracker`] in step with the node events.
#[derive(Debug)]
pub struct PathTrackingWriter<W> {
    inner: W,
    tracker: PathTracker,
}

impl<W: HierarchicalStreamWriter> PathTrackingWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            tracker: PathTracker::new(),
        }
    }

    /// The tracker fed by this writer.
    pub fn tracker(&self) -> &PathTracker {
        &self.tracker
    }

    /// Absolute path of the node currently open.
    pub fn current_path(&self) -> Path {
        self.tracker.path()
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: HierarchicalStreamWriter> HierarchicalStreamWriter for PathTrackingWriter<W> {
    fn start_node(&mut self, name: &str) -> Result<()> {
        self.inner.start_node(name)?;
        self.tracker.push_element(name);
        Ok(())
    }

    fn add_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        self.inner.add_attribute(key, value)
    }

    fn set_value(&mut self, text: &str) -> Result<()> {
        self.inner.set_value(text)
    }

    fn end_node(&mut self) -> Result<()> {
        self.inner.end_node()?;
        self.tracker.pop_element();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

/// Reader wrapper keeping a [`PathTracker`] in step with cursor moves.
///
/// The root node is entered on construction.
#[derive(Debug)]
pub struct PathTrackingReader<R> {
    inner: R,
    tracker: PathTracker,
}

impl<R: HierarchicalStreamReader> PathTrackingReader<R> {
    /// Wrap `inner`, which must be positioned on the root node.
    pub fn new(inner: R) -> Self {
        let mut tracker = PathTracker::new();
        tracker.push_element(&inner.node_name());
        Self { inner, tracker }
    }

    /// The tracker fed by this reader.
    pub fn tracker(&self) -> &PathTracker {
        &self.tracker
    }

    /// Absolute path of the current node.
    pub fn current_path(&self) -> Path {
        self.tracker.path()
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: HierarchicalStreamReader> HierarchicalStreamReader for PathTrackingReader<R> {
    fn node_name(&self) -> Cow<'_, str> {
        self.inner.node_name()
    }

    fn value(&self) -> Cow<'_, str> {
        self.inner.value()
    }

    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        self.inner.attribute(name)
    }

    fn attribute_count(&self) -> usize {
        self.inner.attribute_count()
    }

    fn attribute_name(&self, index: usize) -> Option<Cow<'_, str>> {
        self.inner.attribute_name(index)
    }

    fn attribute_at(&self, index: usize) -> Option<Cow<'_, str>> {
        self.inner.attribute_at(index)
    }

    fn has_more_children(&self) -> bool {
        self.inner.has_more_children()
    }

    fn move_down(&mut self) -> Result<()> {
        self.inner.move_down()?;
        let name = self.inner.node_name().into_owned();
        self.tracker.push_element(&name);
        Ok(())
    }

    fn move_up(&mut self) -> Result<()> {
        self.inner.move_up()?;
        self.tracker.pop_element();
        Ok(())
    }
}

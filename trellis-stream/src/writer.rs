//! Writer side of the hierarchical stream contract

use crate::error::Result;

/// Node-oriented output protocol implemented by every format driver.
///
/// Calls must nest: each `start_node` is closed by exactly one `end_node`.
/// Attributes are only legal directly after `start_node`, before any value
/// or child. A node carries either text (`set_value`) or children, never
/// both. Names passed in are logical names; drivers apply their own
/// [`NameCoder`](crate::NameCoder).
pub trait HierarchicalStreamWriter {
    /// Open a child node of the current node (or the root).
    fn start_node(&mut self, name: &str) -> Result<()>;

    /// Attach an attribute to the node opened last.
    fn add_attribute(&mut self, key: &str, value: &str) -> Result<()>;

    /// Set the text content of the current node.
    fn set_value(&mut self, text: &str) -> Result<()>;

    /// Close the current node.
    fn end_node(&mut self) -> Result<()>;

    /// Flush buffered output, if the driver buffers.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<W: HierarchicalStreamWriter + ?Sized> HierarchicalStreamWriter for &mut W {
    fn start_node(&mut self, name: &str) -> Result<()> {
        (**self).start_node(name)
    }

    fn add_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).add_attribute(key, value)
    }

    fn set_value(&mut self, text: &str) -> Result<()> {
        (**self).set_value(text)
    }

    fn end_node(&mut self) -> Result<()> {
        (**self).end_node()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

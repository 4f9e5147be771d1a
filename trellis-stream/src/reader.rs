//! Reader side of the hierarchical stream contract

use std::borrow::Cow;

use crate::error::Result;

/// Node-oriented input protocol implemented by every format driver.
///
/// A reader starts positioned on the root node. `move_down` enters the next
/// unread child of the current node, `move_up` returns to the parent so the
/// following `move_down` enters the next sibling. Names handed out are
/// logical (decoded) names.
pub trait HierarchicalStreamReader {
    /// Name of the current node.
    fn node_name(&self) -> Cow<'_, str>;

    /// Text content of the current node, empty when it has none.
    fn value(&self) -> Cow<'_, str>;

    /// Attribute of the current node by logical name.
    fn attribute(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Number of attributes on the current node.
    fn attribute_count(&self) -> usize;

    /// Logical name of the attribute at `index`.
    fn attribute_name(&self, index: usize) -> Option<Cow<'_, str>>;

    /// Value of the attribute at `index`.
    fn attribute_at(&self, index: usize) -> Option<Cow<'_, str>>;

    /// Whether the current node has children not yet visited.
    fn has_more_children(&self) -> bool;

    /// Enter the next child node.
    fn move_down(&mut self) -> Result<()>;

    /// Return to the parent node.
    fn move_up(&mut self) -> Result<()>;

    /// Logical names of all attributes on the current node, in order.
    fn attribute_names(&self) -> Vec<String> {
        (0..self.attribute_count())
            .filter_map(|index| self.attribute_name(index).map(Cow::into_owned))
            .collect()
    }
}

impl<R: HierarchicalStreamReader + ?Sized> HierarchicalStreamReader for &mut R {
    fn node_name(&self) -> Cow<'_, str> {
        (**self).node_name()
    }

    fn value(&self) -> Cow<'_, str> {
        (**self).value()
    }

    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        (**self).attribute(name)
    }

    fn attribute_count(&self) -> usize {
        (**self).attribute_count()
    }

    fn attribute_name(&self, index: usize) -> Option<Cow<'_, str>> {
        (**self).attribute_name(index)
    }

    fn attribute_at(&self, index: usize) -> Option<Cow<'_, str>> {
        (**self).attribute_at(index)
    }

    fn has_more_children(&self) -> bool {
        (**self).has_more_children()
    }

    fn move_down(&mut self) -> Result<()> {
        (**self).move_down()
    }

    fn move_up(&mut self) -> Result<()> {
        (**self).move_up()
    }
}

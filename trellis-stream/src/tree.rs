//! In-memory tree driver
//!
//! [`Node`] is a plain element tree: a name, ordered attributes, and either a
//! text value or child nodes. [`TreeWriter`] builds one from writer events and
//! [`TreeReader`] walks one through the reader protocol. Trees serialize to
//! JSON with serde, which makes them the reference format for tests and for
//! persisting marshalled graphs.

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::name_coder::{NameCoder, NoNameCoder};
use crate::reader::HierarchicalStreamReader;
use crate::writer::HierarchicalStreamWriter;

/// Element of an in-memory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node name as stored (encoded)
    pub name: String,
    /// Attributes in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    /// Text content, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Child nodes in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            value: None,
            children: Vec::new(),
        }
    }

    /// Builder-style attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder-style text value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder-style child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute value by stored name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given stored name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Text value, empty when absent.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Render as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a tree from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Writer building a [`Node`] tree.
pub struct TreeWriter {
    coder: Arc<dyn NameCoder>,
    open: Vec<Node>,
    root: Option<Node>,
}

impl Default for TreeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TreeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWriter")
            .field("open", &self.open.len())
            .field("has_root", &self.root.is_some())
            .finish()
    }
}

impl TreeWriter {
    /// Writer storing names unchanged.
    pub fn new() -> Self {
        Self::with_name_coder(Arc::new(NoNameCoder))
    }

    /// Writer encoding names through `coder`.
    pub fn with_name_coder(coder: Arc<dyn NameCoder>) -> Self {
        Self {
            coder,
            open: Vec::new(),
            root: None,
        }
    }

    /// Finish writing and return the root node.
    pub fn into_root(self) -> Result<Node> {
        if let Some(innermost) = self.open.last() {
            return Err(StreamError::UnclosedNodes {
                depth: self.open.len(),
                node: innermost.name.clone(),
            });
        }
        self.root.ok_or(StreamError::NoRoot)
    }
}

impl HierarchicalStreamWriter for TreeWriter {
    fn start_node(&mut self, name: &str) -> Result<()> {
        match self.open.last() {
            None if self.root.is_some() => {
                return Err(StreamError::MultipleRoots {
                    node: name.to_string(),
                })
            }
            Some(parent) if parent.value.is_some() => {
                return Err(StreamError::MixedContent {
                    node: parent.name.clone(),
                })
            }
            _ => {}
        }
        self.open
            .push(Node::new(self.coder.encode_node(name).into_owned()));
        Ok(())
    }

    fn add_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        match self.open.last_mut() {
            Some(node) if node.value.is_none() && node.children.is_empty() => {
                node.attributes.push((
                    self.coder.encode_attribute(key).into_owned(),
                    value.to_string(),
                ));
                Ok(())
            }
            _ => Err(StreamError::AttributeOutOfPlace {
                name: key.to_string(),
            }),
        }
    }

    fn set_value(&mut self, text: &str) -> Result<()> {
        match self.open.last_mut() {
            Some(node) if node.children.is_empty() => {
                node.value = Some(text.to_string());
                Ok(())
            }
            Some(node) => Err(StreamError::MixedContent {
                node: node.name.clone(),
            }),
            None => Err(StreamError::NoOpenNode { content: "a value" }),
        }
    }

    fn end_node(&mut self) -> Result<()> {
        let node = self.open.pop().ok_or(StreamError::UnbalancedEnd)?;
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root = Some(node),
        }
        Ok(())
    }
}

/// Reader walking a borrowed [`Node`] tree.
pub struct TreeReader<'a> {
    coder: Arc<dyn NameCoder>,
    // (node, index of the next child to enter)
    stack: Vec<(&'a Node, usize)>,
}

impl std::fmt::Debug for TreeReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeReader")
            .field("depth", &self.stack.len())
            .finish()
    }
}

impl<'a> TreeReader<'a> {
    /// Reader over `root` with names taken as stored.
    pub fn new(root: &'a Node) -> Self {
        Self::with_name_coder(root, Arc::new(NoNameCoder))
    }

    /// Reader over `root` decoding names through `coder`.
    pub fn with_name_coder(root: &'a Node, coder: Arc<dyn NameCoder>) -> Self {
        Self {
            coder,
            stack: vec![(root, 0)],
        }
    }

    fn current(&self) -> &'a Node {
        // The root entry is never popped.
        self.stack[self.stack.len() - 1].0
    }
}

impl HierarchicalStreamReader for TreeReader<'_> {
    fn node_name(&self) -> Cow<'_, str> {
        self.coder.decode_node(&self.current().name)
    }

    fn value(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.current().text())
    }

    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        let encoded = self.coder.encode_attribute(name);
        self.current().attribute(&encoded).map(Cow::Borrowed)
    }

    fn attribute_count(&self) -> usize {
        self.current().attributes.len()
    }

    fn attribute_name(&self, index: usize) -> Option<Cow<'_, str>> {
        self.current()
            .attributes
            .get(index)
            .map(|(name, _)| self.coder.decode_attribute(name))
    }

    fn attribute_at(&self, index: usize) -> Option<Cow<'_, str>> {
        self.current()
            .attributes
            .get(index)
            .map(|(_, value)| Cow::Borrowed(value.as_str()))
    }

    fn has_more_children(&self) -> bool {
        let (node, next) = self.stack[self.stack.len() - 1];
        next < node.children.len()
    }

    fn move_down(&mut self) -> Result<()> {
        let top = self.stack.len() - 1;
        let (node, next) = self.stack[top];
        let child = node.children.get(next).ok_or_else(|| StreamError::NoMoreChildren {
            node: node.name.clone(),
        })?;
        self.stack[top].1 = next + 1;
        self.stack.push((child, 0));
        Ok(())
    }

    fn move_up(&mut self) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(StreamError::AtRoot);
        }
        self.stack.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_coder::XmlFriendlyNameCoder;

    fn sample() -> Node {
        let mut writer = TreeWriter::new();
        writer.start_node("person").unwrap();
        writer.add_attribute("id", "1").unwrap();
        writer.start_node("name").unwrap();
        writer.set_value("Ada").unwrap();
        writer.end_node().unwrap();
        writer.start_node("age").unwrap();
        writer.set_value("36").unwrap();
        writer.end_node().unwrap();
        writer.end_node().unwrap();
        writer.into_root().unwrap()
    }

    #[test]
    fn test_write_builds_tree() {
        let root = sample();
        assert_eq!(root.name, "person");
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.child("name").map(Node::text), Some("Ada"));
    }

    #[test]
    fn test_read_walks_tree() {
        let root = sample();
        let mut reader = TreeReader::new(&root);
        assert_eq!(reader.node_name(), "person");
        assert_eq!(reader.attribute("id").as_deref(), Some("1"));
        assert_eq!(reader.attribute_names(), vec!["id".to_string()]);

        let mut seen = Vec::new();
        while reader.has_more_children() {
            reader.move_down().unwrap();
            seen.push((reader.node_name().into_owned(), reader.value().into_owned()));
            reader.move_up().unwrap();
        }
        assert_eq!(
            seen,
            vec![
                ("name".to_string(), "Ada".to_string()),
                ("age".to_string(), "36".to_string())
            ]
        );
        assert!(matches!(reader.move_up(), Err(StreamError::AtRoot)));
        assert!(matches!(
            reader.move_down(),
            Err(StreamError::NoMoreChildren { .. })
        ));
    }

    #[test]
    fn test_attribute_after_child_rejected() {
        let mut writer = TreeWriter::new();
        writer.start_node("a").unwrap();
        writer.start_node("b").unwrap();
        writer.end_node().unwrap();
        assert!(matches!(
            writer.add_attribute("late", "x"),
            Err(StreamError::AttributeOutOfPlace { .. })
        ));
    }

    #[test]
    fn test_mixed_content_rejected() {
        let mut writer = TreeWriter::new();
        writer.start_node("a").unwrap();
        writer.set_value("text").unwrap();
        assert!(matches!(
            writer.start_node("b"),
            Err(StreamError::MixedContent { .. })
        ));
    }

    #[test]
    fn test_structure_errors() {
        let mut writer = TreeWriter::new();
        assert!(matches!(writer.end_node(), Err(StreamError::UnbalancedEnd)));
        assert!(matches!(
            writer.set_value("orphan"),
            Err(StreamError::NoOpenNode { content: "a value" })
        ));
        writer.start_node("a").unwrap();
        writer.end_node().unwrap();
        assert!(matches!(
            writer.start_node("b"),
            Err(StreamError::MultipleRoots { .. })
        ));

        let mut open = TreeWriter::new();
        open.start_node("a").unwrap();
        assert!(matches!(
            open.into_root(),
            Err(StreamError::UnclosedNodes { depth: 1, .. })
        ));
        assert!(matches!(TreeWriter::new().into_root(), Err(StreamError::NoRoot)));
    }

    #[test]
    fn test_name_coder_applied_both_ways() {
        let coder: Arc<dyn NameCoder> = Arc::new(XmlFriendlyNameCoder::new());
        let mut writer = TreeWriter::with_name_coder(coder.clone());
        writer.start_node("outer$inner").unwrap();
        writer.add_attribute("my_attr", "v").unwrap();
        writer.end_node().unwrap();
        let root = writer.into_root().unwrap();
        assert_eq!(root.name, "outer_-inner");
        assert_eq!(root.attributes[0].0, "my__attr");

        let reader = TreeReader::with_name_coder(&root, coder);
        assert_eq!(reader.node_name(), "outer$inner");
        assert_eq!(reader.attribute("my_attr").as_deref(), Some("v"));
        assert_eq!(reader.attribute_name(0).as_deref(), Some("my_attr"));
    }

    #[test]
    fn test_json_roundtrip() {
        let root = sample();
        let json = root.to_json().unwrap();
        assert!(json.contains("\"person\""));
        assert_eq!(Node::from_json(&json).unwrap(), root);
        assert!(Node::from_json("{not json").is_err());
    }
}

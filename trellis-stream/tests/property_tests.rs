//! Property-based tests for Trellis stream primitives

use std::sync::Arc;

use proptest::prelude::*;
use trellis_stream::{
    HierarchicalStreamReader, HierarchicalStreamWriter, NameCoder, Node, PathTrackingReader,
    PathTrackingWriter, TreeReader, TreeWriter, XmlFriendlyNameCoder,
};

fn arb_tree() -> impl Strategy<Value = Node> {
    let name = "[a-z_$][a-z0-9_$.-]{0,6}";
    let leaf = (name, prop::option::of("[ -~]{0,12}"), prop::collection::vec(("[a-z]{1,4}", "[ -~]{0,6}"), 0..3))
        .prop_map(|(name, value, attributes)| {
            let mut node = Node::new(name);
            node.value = value;
            for (key, value) in attributes {
                if node.attribute(&key).is_none() {
                    node.attributes.push((key, value));
                }
            }
            node
        });
    leaf.prop_recursive(4, 32, 4, move |inner| {
        (name, prop::collection::vec(inner, 1..4)).prop_map(|(name, children)| {
            let mut node = Node::new(name);
            node.children = children;
            node
        })
    })
}

/// Replay a tree through the writer protocol.
fn write_tree<W: HierarchicalStreamWriter>(node: &Node, writer: &mut W) {
    writer.start_node(&node.name).unwrap();
    for (key, value) in &node.attributes {
        writer.add_attribute(key, value).unwrap();
    }
    if let Some(value) = &node.value {
        writer.set_value(value).unwrap();
    }
    for child in &node.children {
        write_tree(child, writer);
    }
    writer.end_node().unwrap();
}

/// Rebuild a tree by walking the reader protocol.
fn read_tree<R: HierarchicalStreamReader>(reader: &mut R) -> Node {
    let mut node = Node::new(reader.node_name().into_owned());
    for index in 0..reader.attribute_count() {
        node.attributes.push((
            reader.attribute_name(index).unwrap().into_owned(),
            reader.attribute_at(index).unwrap().into_owned(),
        ));
    }
    if !reader.has_more_children() {
        node.value = Some(reader.value().into_owned());
    }
    while reader.has_more_children() {
        reader.move_down().unwrap();
        node.children.push(read_tree(reader));
        reader.move_up().unwrap();
    }
    node
}

/// Collect every path visited by a tracking reader, depth first.
fn visit_paths<R: HierarchicalStreamReader>(reader: &mut PathTrackingReader<R>, out: &mut Vec<String>) {
    out.push(reader.current_path().to_string());
    while reader.has_more_children() {
        reader.move_down().unwrap();
        visit_paths(reader, out);
        reader.move_up().unwrap();
    }
}

/// Leaves read back with an empty text value when none was written.
fn normalize_values(node: &mut Node) {
    if node.children.is_empty() {
        node.value.get_or_insert_with(String::new);
    } else {
        node.value = None;
    }
    node.children.iter_mut().for_each(normalize_values);
}

proptest! {
    #[test]
    fn tree_replay_roundtrip_property(tree in arb_tree()) {
        let coder: Arc<dyn NameCoder> = Arc::new(XmlFriendlyNameCoder::new());
        let mut writer = TreeWriter::with_name_coder(coder.clone());
        write_tree(&tree, &mut writer);
        let stored = writer.into_root().unwrap();

        let mut reader = TreeReader::with_name_coder(&stored, coder);
        let replayed = read_tree(&mut reader);

        let mut expected = tree.clone();
        normalize_values(&mut expected);
        prop_assert_eq!(replayed, expected);
    }

    #[test]
    fn tree_json_roundtrip_property(tree in arb_tree()) {
        let json = tree.to_json().unwrap();
        prop_assert_eq!(Node::from_json(&json).unwrap(), tree);
    }

    #[test]
    fn tracked_paths_match_on_both_sides_property(tree in arb_tree()) {
        struct Recorder<'a> {
            inner: PathTrackingWriter<&'a mut TreeWriter>,
            paths: Vec<String>,
        }
        impl HierarchicalStreamWriter for Recorder<'_> {
            fn start_node(&mut self, name: &str) -> trellis_stream::Result<()> {
                self.inner.start_node(name)?;
                self.paths.push(self.inner.current_path().to_string());
                Ok(())
            }
            fn add_attribute(&mut self, key: &str, value: &str) -> trellis_stream::Result<()> {
                self.inner.add_attribute(key, value)
            }
            fn set_value(&mut self, text: &str) -> trellis_stream::Result<()> {
                self.inner.set_value(text)
            }
            fn end_node(&mut self) -> trellis_stream::Result<()> {
                self.inner.end_node()
            }
        }

        let mut sink = TreeWriter::new();
        let mut recorder = Recorder { inner: PathTrackingWriter::new(&mut sink), paths: Vec::new() };
        write_tree(&tree, &mut recorder);
        let written = recorder.paths;
        let stored = sink.into_root().unwrap();

        let mut reader = PathTrackingReader::new(TreeReader::new(&stored));
        let mut read = Vec::new();
        visit_paths(&mut reader, &mut read);
        prop_assert_eq!(written, read);
    }
}

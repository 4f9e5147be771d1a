//! Node tree inspection

use std::fmt::Write;

use trellis_stream::Node;

/// Names of the direct children of `node`, in order.
pub fn child_names(node: &Node) -> Vec<&str> {
    node.children.iter().map(|child| child.name.as_str()).collect()
}

/// Node at `path` below `node`.
///
/// Segments are separated by `/`; `name[n]` selects the n-th sibling named
/// `name`, counting from 1.
pub fn find<'a>(node: &'a Node, path: &str) -> Option<&'a Node> {
    let mut current = node;
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        let (name, index) = match segment.strip_suffix(']').and_then(|s| s.split_once('[')) {
            Some((name, index)) => (name, index.parse::<usize>().ok()?.checked_sub(1)?),
            None => (segment, 0),
        };
        current = current.children.iter().filter(|child| child.name == name).nth(index)?;
    }
    Some(current)
}

/// Number of nodes in the subtree carrying attribute `key`.
pub fn count_attribute(node: &Node, key: &str) -> usize {
    let own = usize::from(node.attribute(key).is_some());
    own + node
        .children
        .iter()
        .map(|child| count_attribute(child, key))
        .sum::<usize>()
}

/// Number of nodes in the subtree.
pub fn node_count(node: &Node) -> usize {
    1 + node.children.iter().map(node_count).sum::<usize>()
}

/// XML-like rendering, for assertion messages.
pub fn render(node: &Node) -> String {
    let mut out = String::new();
    render_into(node, 0, &mut out);
    out
}

fn render_into(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{}<{}", indent, node.name);
    for (key, value) in &node.attributes {
        let _ = write!(out, " {}=\"{}\"", key, value);
    }
    if node.children.is_empty() {
        match node.value.as_deref() {
            Some(value) => {
                let _ = writeln!(out, ">{}</{}>", value, node.name);
            }
            None => out.push_str("/>\n"),
        }
        return;
    }
    out.push_str(">\n");
    for child in &node.children {
        render_into(child, depth + 1, out);
    }
    let _ = writeln!(out, "{}</{}>", indent, node.name);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::new("team")
            .with_attribute("id", "1")
            .with_child(Node::new("name").with_value("core"))
            .with_child(Node::new("person").with_child(Node::new("first").with_value("Ada")))
            .with_child(Node::new("person").with_attribute("reference", "../person"))
    }

    #[test]
    fn test_find() {
        let node = sample();
        assert_eq!(find(&node, "name").unwrap().text(), "core");
        assert_eq!(find(&node, "person/first").unwrap().text(), "Ada");
        assert_eq!(find(&node, "person[2]").unwrap().attribute("reference"), Some("../person"));
        assert!(find(&node, "person[3]").is_none());
        assert!(find(&node, "person[0]").is_none());
        assert_eq!(find(&node, "").unwrap().name, "team");
    }

    #[test]
    fn test_counts() {
        let node = sample();
        assert_eq!(child_names(&node), ["name", "person", "person"]);
        assert_eq!(count_attribute(&node, "reference"), 1);
        assert_eq!(node_count(&node), 5);
    }

    #[test]
    fn test_render() {
        let rendered = render(&Node::new("a").with_attribute("id", "1").with_child(Node::new("b").with_value("x")));
        assert_eq!(rendered, "<a id=\"1\">\n  <b>x</b>\n</a>\n");
    }
}

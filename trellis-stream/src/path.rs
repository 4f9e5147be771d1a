//! Slash-separated node paths
//!
//! A [`Path`] addresses a single node in a hierarchical stream, e.g.
//! `/company/staff/person[2]/name`. Same-named siblings are disambiguated by
//! an index selector; the first occurrence carries none, and a trailing `[1]`
//! is normalised away so `a[1]/b` and `a/b` compare equal.
//!
//! Two absolute paths can be compared to produce a relative path, and a
//! relative path applied to an absolute one yields another absolute path:
//!
//! ```
//! use trellis_stream::Path;
//!
//! let from = Path::new("/html/body/div[1]/table[2]/tr[3]/td/div");
//! let to = Path::new("/html/body/div/table[2]/tr[6]/td/form");
//! let relative = from.relative_to(&to);
//! assert_eq!(relative.to_string(), "../../../tr[6]/td/form");
//! assert_eq!(from.apply(&relative), to);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

const SEPARATOR: char = '/';
const PARENT: &str = "..";
const CURRENT: &str = ".";
const FIRST_SELECTOR: &str = "[1]";

/// Path to a single node in a hierarchical stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    chunks: SmallVec<[String; 8]>,
}

impl Path {
    /// Parse a path expression.
    pub fn new(path: &str) -> Self {
        Self::from_chunks(path.split(SEPARATOR))
    }

    /// Build a path from its chunks. An absolute path starts with an empty chunk.
    pub fn from_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            chunks: chunks
                .into_iter()
                .map(|chunk| normalize(chunk.as_ref()).to_string())
                .collect(),
        }
    }

    /// The relative path `.` selecting the node itself.
    pub fn dot() -> Self {
        Self::from_chunks([CURRENT])
    }

    /// Chunks between separators.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Whether this path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.chunks.first().is_some_and(|first| first.is_empty())
    }

    /// Number of chunks, including the leading empty chunk of absolute paths.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the path has no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Relative path leading from `self` to `that`.
    ///
    /// Climbs with `..` up to the deepest common ancestor, then descends. Equal
    /// paths produce `.`.
    pub fn relative_to(&self, that: &Path) -> Path {
        let divergence = depth_of_divergence(&self.chunks, &that.chunks);
        let mut result: SmallVec<[String; 8]> = SmallVec::new();

        for _ in divergence..self.chunks.len() {
            result.push(PARENT.to_string());
        }
        for chunk in &that.chunks[divergence..] {
            result.push(chunk.clone());
        }

        if result.is_empty() {
            Self::dot()
        } else {
            Self { chunks: result }
        }
    }

    /// Resolve a relative path against `self`.
    pub fn apply(&self, relative: &Path) -> Path {
        let mut stack: SmallVec<[String; 8]> = self.chunks.clone();

        for chunk in &relative.chunks {
            match chunk.as_str() {
                PARENT => {
                    stack.pop();
                }
                CURRENT => {}
                _ => stack.push(chunk.clone()),
            }
        }

        Self { chunks: stack }
    }

    /// Whether `child` is this path or lies below it.
    pub fn is_ancestor(&self, child: &Path) -> bool {
        child.chunks.len() >= self.chunks.len()
            && self
                .chunks
                .iter()
                .zip(child.chunks.iter())
                .all(|(mine, theirs)| mine == theirs)
    }

    /// Render with an explicit `[1]` on every unindexed chunk, so the
    /// expression selects a single node rather than a node list.
    pub fn explicit(&self) -> String {
        let mut buffer = String::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 {
                buffer.push(SEPARATOR);
            }
            buffer.push_str(chunk);
            if let Some(last) = chunk.chars().last() {
                if last != ']' && last != '.' {
                    buffer.push_str(FIRST_SELECTOR);
                }
            }
        }
        buffer
    }
}

fn normalize(chunk: &str) -> &str {
    if chunk.len() > FIRST_SELECTOR.len() && chunk.ends_with(FIRST_SELECTOR) {
        &chunk[..chunk.len() - FIRST_SELECTOR.len()]
    } else {
        chunk
    }
}

fn depth_of_divergence(left: &[String], right: &[String]) -> usize {
    left.iter()
        .zip(right.iter())
        .position(|(l, r)| l != r)
        .unwrap_or_else(|| left.len().min(right.len()))
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_and_display() {
        let path = Path::new("/a/b/c");
        assert!(path.is_absolute());
        assert_eq!(path.chunks(), &["", "a", "b", "c"]);
        assert_eq!(path.to_string(), "/a/b/c");
    }

    #[test]
    fn test_first_selector_is_normalized() {
        assert_eq!(Path::new("/a[1]/b[1]/c"), Path::new("/a/b/c"));
        assert_ne!(Path::new("/a[2]/b"), Path::new("/a/b"));
        assert_eq!(Path::new("/a[1]").to_string(), "/a");
    }

    #[test]
    fn test_relative_to_sibling_subtree() {
        let from = Path::new("/a/b/c");
        let to = Path::new("/a/d");
        let relative = from.relative_to(&to);
        assert_eq!(relative.to_string(), "../../d");
        assert!(!relative.is_absolute());
        assert_eq!(from.apply(&relative), to);
    }

    #[test]
    fn test_relative_to_ancestor_and_descendant() {
        let deep = Path::new("/a/b/c");
        let shallow = Path::new("/a");
        assert_eq!(deep.relative_to(&shallow).to_string(), "../..");
        assert_eq!(shallow.relative_to(&deep).to_string(), "b/c");
    }

    #[test]
    fn test_relative_to_self_is_dot() {
        let path = Path::new("/a/b");
        assert_eq!(path.relative_to(&path), Path::dot());
        assert_eq!(path.apply(&Path::dot()), path);
    }

    #[test]
    fn test_is_ancestor() {
        let parent = Path::new("/a/b");
        assert!(parent.is_ancestor(&Path::new("/a/b/c")));
        assert!(parent.is_ancestor(&Path::new("/a/b")));
        assert!(!parent.is_ancestor(&Path::new("/a")));
        assert!(!parent.is_ancestor(&Path::new("/a/c/b")));
    }

    #[test]
    fn test_explicit() {
        let path = Path::new("/a/b[2]/c");
        assert_eq!(path.explicit(), "/a[1]/b[2]/c[1]");
        assert_eq!(Path::new("../x").explicit(), "../x[1]");
    }

    fn absolute_path() -> impl Strategy<Value = Path> {
        let chunk = ("[abc]", 1usize..4).prop_map(|(name, index)| {
            if index > 1 {
                format!("{}[{}]", name, index)
            } else {
                name
            }
        });
        prop::collection::vec(chunk, 0..6).prop_map(|chunks| {
            Path::from_chunks(std::iter::once(String::new()).chain(chunks))
        })
    }

    proptest! {
        #[test]
        fn prop_apply_inverts_relative_to(from in absolute_path(), to in absolute_path()) {
            let relative = from.relative_to(&to);
            prop_assert_eq!(from.apply(&relative), to);
        }

        #[test]
        fn prop_relative_path_survives_text(from in absolute_path(), to in absolute_path()) {
            let relative = from.relative_to(&to);
            let reparsed = Path::new(&relative.to_string());
            prop_assert_eq!(from.apply(&reparsed), to);
        }
    }
}

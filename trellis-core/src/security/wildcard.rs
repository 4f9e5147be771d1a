//! Name patterns over canonical type names

use super::{TypePermission, Verdict};
use crate::types::{TypeKey, TypeRegistry};

/// Allows types whose canonical name matches one of the patterns.
///
/// `*` matches within one namespace segment, `**` matches across segments:
/// `acme.*` covers `acme.Dog` but not `acme.zoo.Dog`, `acme.**` covers both.
#[derive(Debug, Clone)]
pub struct WildcardTypePermission {
    patterns: Vec<String>,
}

impl WildcardTypePermission {
    /// Permission for the given patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` matches any pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| matches(pattern.as_bytes(), name.as_bytes()))
    }
}

impl TypePermission for WildcardTypePermission {
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict {
        if self.matches(registry.name(ty)) {
            Verdict::Allow
        } else {
            Verdict::Abstain
        }
    }
}

fn matches(pattern: &[u8], name: &[u8]) -> bool {
    match pattern {
        [] => name.is_empty(),
        [b'*', b'*', rest @ ..] => (0..=name.len()).any(|skip| matches(rest, &name[skip..])),
        [b'*', rest @ ..] => {
            let segment = name.iter().position(|&b| b == b'.').unwrap_or(name.len());
            (0..=segment).any(|skip| matches(rest, &name[skip..]))
        }
        [first, rest @ ..] => name.first() == Some(first) && matches(rest, &name[1..]),
    }
}

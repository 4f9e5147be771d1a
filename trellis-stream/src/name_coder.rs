//! Name coding between logical names and format-safe names
//!
//! Format drivers pass every node and attribute name through a [`NameCoder`]
//! on the way out and back through it on the way in. Coders must be
//! invertible: `decode_node(encode_node(n)) == n` for every logical name.

use std::borrow::Cow;

use ahash::AHashMap;
use parking_lot::RwLock;

/// Translation between logical names and names that are safe in a target format.
pub trait NameCoder: Send + Sync {
    /// Encode a logical name for use as a node name.
    fn encode_node<'a>(&self, name: &'a str) -> Cow<'a, str>;

    /// Decode a node name back to its logical name.
    fn decode_node<'a>(&self, encoded: &'a str) -> Cow<'a, str>;

    /// Encode a logical name for use as an attribute name.
    fn encode_attribute<'a>(&self, name: &'a str) -> Cow<'a, str>;

    /// Decode an attribute name back to its logical name.
    fn decode_attribute<'a>(&self, encoded: &'a str) -> Cow<'a, str>;
}

/// Identity coder for formats that accept any name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNameCoder;

impl NameCoder for NoNameCoder {
    fn encode_node<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }

    fn decode_node<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(encoded)
    }

    fn encode_attribute<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }

    fn decode_attribute<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(encoded)
    }
}

/// Bidirectional lookup table used by [`StaticNameCoder`].
#[derive(Debug, Clone, Default)]
struct NameTable {
    encode: AHashMap<String, String>,
    decode: AHashMap<String, String>,
}

impl NameTable {
    fn new(mapping: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut table = Self::default();
        for (logical, encoded) in mapping {
            table.decode.insert(encoded.clone(), logical.clone());
            table.encode.insert(logical, encoded);
        }
        table
    }

    fn encode<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self.encode.get(name) {
            Some(encoded) => Cow::Owned(encoded.clone()),
            None => Cow::Borrowed(name),
        }
    }

    fn decode<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        match self.decode.get(encoded) {
            Some(name) => Cow::Owned(name.clone()),
            None => Cow::Borrowed(encoded),
        }
    }
}

/// Table-driven coder with explicit logical → encoded maps.
///
/// Names absent from a table pass through unchanged. Node names and
/// attribute names use independent tables unless built with
/// [`StaticNameCoder::shared`]. Each table must be injective and must not map
/// onto a name that is itself used unmapped, otherwise decoding is ambiguous.
#[derive(Debug, Clone, Default)]
pub struct StaticNameCoder {
    nodes: NameTable,
    attributes: NameTable,
}

impl StaticNameCoder {
    /// Create a coder with separate node and attribute tables.
    pub fn new(
        node_names: impl IntoIterator<Item = (String, String)>,
        attribute_names: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            nodes: NameTable::new(node_names),
            attributes: NameTable::new(attribute_names),
        }
    }

    /// Create a coder using one table for both nodes and attributes.
    pub fn shared(names: impl IntoIterator<Item = (String, String)>) -> Self {
        let table = NameTable::new(names);
        Self {
            nodes: table.clone(),
            attributes: table,
        }
    }
}

impl NameCoder for StaticNameCoder {
    fn encode_node<'a>(&self, name: &'a str) -> Cow<'a, str> {
        self.nodes.encode(name)
    }

    fn decode_node<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        self.nodes.decode(encoded)
    }

    fn encode_attribute<'a>(&self, name: &'a str) -> Cow<'a, str> {
        self.attributes.encode(name)
    }

    fn decode_attribute<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        self.attributes.decode(encoded)
    }
}

/// Replacement for `$`
const DOLLAR_REPLACEMENT: &str = "_-";
/// Replacement for the escape character itself
const ESCAPE_REPLACEMENT: &str = "__";
/// Prefix for a hex-encoded code point
const HEX_PREFIX: &str = "_.";
/// Hex digits per encoded code point (covers U+10FFFF)
const HEX_DIGITS: usize = 6;
/// Entries kept per memoization cache
const CACHE_CAPACITY: usize = 4_096;

/// Coder producing names that are valid XML element and attribute names.
///
/// - `$` becomes `_-`
/// - `_` becomes `__`
/// - any other character not allowed at its position becomes `_.` followed
///   by six lowercase hex digits of its code point
///
/// Results are memoized in bounded caches shared by all threads using the coder.
#[derive(Debug, Default)]
pub struct XmlFriendlyNameCoder {
    encode_cache: RwLock<AHashMap<String, String>>,
    decode_cache: RwLock<AHashMap<String, String>>,
}

impl XmlFriendlyNameCoder {
    /// Create a coder with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    fn is_name_start(c: char) -> bool {
        c.is_alphabetic()
    }

    fn is_name_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '.'
    }

    fn needs_encoding(name: &str) -> bool {
        name.chars().enumerate().any(|(i, c)| {
            let valid = if i == 0 {
                Self::is_name_start(c)
            } else {
                Self::is_name_char(c)
            };
            !valid
        })
    }

    fn encode_name(name: &str) -> String {
        let mut result = String::with_capacity(name.len() + 8);
        for (i, c) in name.chars().enumerate() {
            match c {
                '$' => result.push_str(DOLLAR_REPLACEMENT),
                '_' => result.push_str(ESCAPE_REPLACEMENT),
                c if (i == 0 && Self::is_name_start(c)) || (i > 0 && Self::is_name_char(c)) => {
                    result.push(c)
                }
                c => {
                    result.push_str(HEX_PREFIX);
                    result.push_str(&format!("{:0width$x}", c as u32, width = HEX_DIGITS));
                }
            }
        }
        result
    }

    fn decode_name(encoded: &str) -> String {
        let mut result = String::with_capacity(encoded.len());
        let mut rest = encoded;
        while let Some(pos) = rest.find('_') {
            result.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with(DOLLAR_REPLACEMENT) {
                result.push('$');
                rest = &tail[DOLLAR_REPLACEMENT.len()..];
            } else if tail.starts_with(ESCAPE_REPLACEMENT) {
                result.push('_');
                rest = &tail[ESCAPE_REPLACEMENT.len()..];
            } else if let Some(c) = Self::decode_hex(tail) {
                result.push(c);
                rest = &tail[HEX_PREFIX.len() + HEX_DIGITS..];
            } else {
                // Not produced by encode_name; keep verbatim
                result.push('_');
                rest = &tail[1..];
            }
        }
        result.push_str(rest);
        result
    }

    fn decode_hex(tail: &str) -> Option<char> {
        let digits = tail.strip_prefix(HEX_PREFIX)?.get(..HEX_DIGITS)?;
        u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
    }

    fn cached(
        cache: &RwLock<AHashMap<String, String>>,
        name: &str,
        compute: impl FnOnce(&str) -> String,
    ) -> String {
        if let Some(hit) = cache.read().get(name) {
            return hit.clone();
        }
        let computed = compute(name);
        let mut guard = cache.write();
        if guard.len() < CACHE_CAPACITY {
            guard.insert(name.to_string(), computed.clone());
        }
        computed
    }

    fn encode<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if !Self::needs_encoding(name) {
            return Cow::Borrowed(name);
        }
        Cow::Owned(Self::cached(&self.encode_cache, name, Self::encode_name))
    }

    fn decode<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        if !encoded.contains('_') {
            return Cow::Borrowed(encoded);
        }
        Cow::Owned(Self::cached(&self.decode_cache, encoded, Self::decode_name))
    }
}

impl NameCoder for XmlFriendlyNameCoder {
    fn encode_node<'a>(&self, name: &'a str) -> Cow<'a, str> {
        self.encode(name)
    }

    fn decode_node<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        self.decode(encoded)
    }

    fn encode_attribute<'a>(&self, name: &'a str) -> Cow<'a, str> {
        self.encode(name)
    }

    fn decode_attribute<'a>(&self, encoded: &'a str) -> Cow<'a, str> {
        self.decode(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_name_coder_is_identity() {
        let coder = NoNameCoder;
        assert_eq!(coder.encode_node("a$b c"), "a$b c");
        assert_eq!(coder.decode_attribute("a$b c"), "a$b c");
    }

    #[test]
    fn test_xml_friendly_escapes_dollar_and_underscore() {
        let coder = XmlFriendlyNameCoder::new();
        assert_eq!(coder.encode_node("Outer$Inner"), "Outer_-Inner");
        assert_eq!(coder.encode_node("my_field"), "my__field");
        assert_eq!(coder.decode_node("Outer_-Inner"), "Outer$Inner");
        assert_eq!(coder.decode_node("my__field"), "my_field");
    }

    #[test]
    fn test_xml_friendly_hex_escapes_invalid_chars() {
        let coder = XmlFriendlyNameCoder::new();
        assert_eq!(coder.encode_node("a b"), "a_.000020b");
        assert_eq!(coder.encode_node("1st"), "_.000031st");
        assert_eq!(coder.decode_node("_.000031st"), "1st");
        assert_eq!(coder.decode_node("a_.000020b"), "a b");
    }

    #[test]
    fn test_xml_friendly_leaves_valid_names_borrowed() {
        let coder = XmlFriendlyNameCoder::new();
        assert!(matches!(coder.encode_node("acme.Person"), Cow::Borrowed(_)));
        assert!(matches!(coder.decode_node("acme.Person"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_xml_friendly_cache_is_consistent() {
        let coder = XmlFriendlyNameCoder::new();
        let first = coder.encode_node("x$y").into_owned();
        let second = coder.encode_node("x$y").into_owned();
        assert_eq!(first, second);
        assert_eq!(coder.encode_cache.read().len(), 1);
    }

    #[test]
    fn test_static_coder_independent_tables() {
        let coder = StaticNameCoder::new(
            vec![("acme.Person".to_string(), "person".to_string())],
            vec![("class".to_string(), "type".to_string())],
        );
        assert_eq!(coder.encode_node("acme.Person"), "person");
        assert_eq!(coder.decode_node("person"), "acme.Person");
        assert_eq!(coder.encode_attribute("acme.Person"), "acme.Person");
        assert_eq!(coder.encode_attribute("class"), "type");
        assert_eq!(coder.decode_attribute("type"), "class");
        assert_eq!(coder.encode_node("unmapped"), "unmapped");
    }

    #[test]
    fn test_static_coder_shared_table() {
        let coder = StaticNameCoder::shared(vec![("a".to_string(), "b".to_string())]);
        assert_eq!(coder.encode_node("a"), "b");
        assert_eq!(coder.encode_attribute("a"), "b");
        assert_eq!(coder.decode_attribute("b"), "a");
    }

    proptest! {
        #[test]
        fn prop_xml_friendly_roundtrip(name in "[a-zA-Z0-9_$ .:<>&\\-\u{e9}\u{1F600}]{0,24}") {
            let coder = XmlFriendlyNameCoder::new();
            let encoded = coder.encode_node(&name).into_owned();
            prop_assert_eq!(coder.decode_node(&encoded), name.as_str());
            let encoded_attribute = coder.encode_attribute(&name).into_owned();
            prop_assert_eq!(coder.decode_attribute(&encoded_attribute), name.as_str());
        }

        #[test]
        fn prop_xml_friendly_output_is_xml_safe(name in "\\PC{1,16}") {
            let coder = XmlFriendlyNameCoder::new();
            let encoded = coder.encode_node(&name).into_owned();
            let mut chars = encoded.chars();
            let first = chars.next().unwrap();
            prop_assert!(first.is_alphabetic() || first == '_');
            prop_assert!(chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_')));
        }
    }
}

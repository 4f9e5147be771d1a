//! Engine options
//!
//! The declarative part of engine configuration. Everything here can also be
//! loaded from JSON; missing keys keep their defaults.

use std::sync::Arc;

use serde::Deserialize;
use trellis_core::{ErrorKind, ReferenceMode, Result};
use trellis_stream::{NameCoder, NoNameCoder, XmlFriendlyNameCoder};

/// How node and attribute names are encoded on the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameCoderChoice {
    /// Names are written as they are
    None,
    /// Characters illegal in XML names are escaped
    #[default]
    XmlFriendly,
}

impl NameCoderChoice {
    /// Instantiate the selected coder.
    pub fn coder(self) -> Arc<dyn NameCoder> {
        match self {
            NameCoderChoice::None => Arc::new(NoNameCoder),
            NameCoderChoice::XmlFriendly => Arc::new(XmlFriendlyNameCoder::new()),
        }
    }
}

/// Options shaping how an engine writes and reads graphs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineOptions {
    /// How repeated objects are marked
    pub reference_mode: ReferenceMode,
    /// Skip elements that match no field instead of failing
    pub ignore_unknown_elements: bool,
    /// Name encoding applied by the built-in tree drivers
    pub name_coder: NameCoderChoice,
    /// Register short aliases (`string`, `int`, `list`, ...) for the built-in types
    pub default_aliases: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            reference_mode: ReferenceMode::Id,
            ignore_unknown_elements: false,
            name_coder: NameCoderChoice::XmlFriendly,
            default_aliases: true,
        }
    }
}

impl EngineOptions {
    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| ErrorKind::InvalidConfiguration(format!("invalid engine options: {}", err)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.reference_mode, ReferenceMode::Id);
        assert!(!options.ignore_unknown_elements);
        assert_eq!(options.name_coder, NameCoderChoice::XmlFriendly);
        assert!(options.default_aliases);
    }

    #[test]
    fn test_from_json_keeps_missing_defaults() {
        let options = EngineOptions::from_json(r#"{"reference-mode": "absolute-path", "name-coder": "none"}"#).unwrap();
        assert_eq!(options.reference_mode, ReferenceMode::AbsolutePath);
        assert_eq!(options.name_coder, NameCoderChoice::None);
        assert!(options.default_aliases);

        let options = EngineOptions::from_json("{}").unwrap();
        assert_eq!(options, EngineOptions::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_keys() {
        let error = EngineOptions::from_json(r#"{"references": "id"}"#).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));

        let error = EngineOptions::from_json(r#"{"reference-mode": "sometimes"}"#).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));
    }
}
